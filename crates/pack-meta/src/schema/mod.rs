//! Declarative data model for packs and components.

mod component;
mod pack;

pub use component::{
    Component, CopyFileKind, InstallAction, ServiceEntry, ServiceScope, plugin_names_match,
};
pub use pack::{
    CheckScope, ConfigureProject, HookFragment, Pack, PackManifest, PackSource, Prompt,
    PromptKind, SCHEMA_VERSION, SupplementaryCheck, TemplateContribution, TemplateSource,
};
