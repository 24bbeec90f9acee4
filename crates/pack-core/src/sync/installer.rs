//! Contract for the external collaborator that performs installs

use std::collections::BTreeMap;
use std::path::Path;

use pack_meta::{Component, Pack};

use crate::Result;
use crate::scope::Scope;
use crate::state::ArtifactRecord;

/// Everything an installer may need besides the component itself.
#[derive(Debug)]
pub struct InstallContext<'a> {
    pub scope: &'a Scope,
    /// Directory scope-relative artifact paths are resolved against.
    pub scope_root: &'a Path,
    pub pack: &'a Pack,
    /// Placeholder values known for this run.
    pub values: &'a BTreeMap<String, String>,
}

/// Performs the side effects of one install action.
///
/// The returned record must list only what this call created. An artifact
/// that already existed (a package installed by hand, a service entry the
/// user registered) must be left out, otherwise removing the pack later
/// would delete something it never owned.
pub trait ComponentInstaller {
    fn install(&mut self, component: &Component, ctx: &InstallContext<'_>) -> Result<ArtifactRecord>;
}
