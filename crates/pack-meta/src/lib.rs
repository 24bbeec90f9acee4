//! Pack, component and catalog model for the pack convergence engine.
//!
//! This crate holds the already-parsed, already-validated view of packs:
//!
//! - [`schema`]: components, install actions and pack manifests
//! - [`catalog`]: the [`PackLookup`] contract and the [`PackCatalog`] that
//!   lets external packs shadow built-ins
//! - [`resolver`]: dependency ordering of selected components

pub mod catalog;
pub mod error;
pub mod resolver;
pub mod schema;

pub use catalog::{PackCatalog, PackLookup};
pub use error::{Error, Result};
pub use resolver::{Plan, resolve};
pub use schema::{
    CheckScope, Component, ConfigureProject, CopyFileKind, HookFragment, InstallAction, Pack,
    PackManifest, PackSource, Prompt, PromptKind, ServiceEntry, ServiceScope, SupplementaryCheck,
    TemplateContribution, TemplateSource, plugin_names_match,
};
