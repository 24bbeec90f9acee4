//! Scopes: the global scope or one project directory

use std::fmt;
use std::path::{Path, PathBuf};

use pack_meta::CheckScope;

use crate::config::EngineConfig;

/// Index key reserved for the global scope.
pub const GLOBAL_SENTINEL: &str = "__global__";

/// Where a set of packs is configured.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Global,
    Project(PathBuf),
}

impl Scope {
    /// A project scope rooted at `path`.
    ///
    /// The path is canonicalized when it exists, and cleaned lexically
    /// otherwise, so `app`, `app/` and `./app/../app` name one scope in the
    /// index.
    pub fn project(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let canonical = dunce::canonicalize(&path).unwrap_or_else(|_| path.components().collect());
        Self::Project(canonical)
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Key under which this scope is stored in the index.
    pub fn index_key(&self) -> String {
        match self {
            Self::Global => GLOBAL_SENTINEL.to_string(),
            Self::Project(path) => path.to_string_lossy().into_owned(),
        }
    }

    pub fn from_index_key(key: &str) -> Self {
        if key == GLOBAL_SENTINEL {
            Self::Global
        } else {
            Self::Project(PathBuf::from(key))
        }
    }

    /// Whether the scope still exists. The global scope always does.
    pub fn exists(&self) -> bool {
        match self {
            Self::Global => true,
            Self::Project(path) => path.is_dir(),
        }
    }

    /// Directory that scope-relative artifact paths are resolved against.
    pub fn root<'a>(&'a self, config: &'a EngineConfig) -> &'a Path {
        match self {
            Self::Global => config.home(),
            Self::Project(path) => path,
        }
    }

    pub fn state_path(&self, config: &EngineConfig) -> PathBuf {
        match self {
            Self::Global => config.global_state_path(),
            Self::Project(path) => config.project_state_path(path),
        }
    }

    pub fn manifest_path(&self, config: &EngineConfig) -> PathBuf {
        match self {
            Self::Global => config.manifest_path(),
            Self::Project(path) => config.project_manifest_path(path),
        }
    }

    pub fn generated_file(&self, config: &EngineConfig) -> PathBuf {
        match self {
            Self::Global => config.global_generated_file(),
            Self::Project(path) => config.project_generated_file(path),
        }
    }

    /// Whether a check declared for `check_scope` applies here.
    pub fn admits(&self, check_scope: CheckScope) -> bool {
        match check_scope {
            CheckScope::Any => true,
            CheckScope::Global => self.is_global(),
            CheckScope::Project => !self.is_global(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global scope"),
            Self::Project(path) => write!(f, "project {}", path.display()),
        }
    }
}
