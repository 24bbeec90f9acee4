//! Pack manifests and loaded packs.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::component::{Component, plugin_names_match};
use crate::error::{Error, Result};

/// Manifest schema version understood by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// The already-parsed, declarative form of a pack.
///
/// Paths inside a manifest (`content_file`, copy sources, scripts, hook
/// fragments) are relative to the pack root and are only trusted after the
/// sandbox check in `pack-trust`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub identifier: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub templates: Vec<TemplateSource>,
    #[serde(default)]
    pub gitignore_entries: Vec<String>,
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub checks: Vec<SupplementaryCheck>,
    #[serde(default)]
    pub configure_project: Option<ConfigureProject>,
    #[serde(default)]
    pub hook_fragments: Vec<HookFragment>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl PackManifest {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            identifier: identifier.into(),
            display_name: display_name.into(),
            description: String::new(),
            version: version.into(),
            components: Vec::new(),
            templates: Vec::new(),
            gitignore_entries: Vec::new(),
            prompts: Vec::new(),
            checks: Vec::new(),
            configure_project: None,
            hook_fragments: Vec::new(),
        }
    }

    /// Validate the version string, and that component ids carry this
    /// pack's prefix and, like section ids, appear once.
    pub fn validate(&self) -> Result<()> {
        semver::Version::parse(&self.version).map_err(|source| Error::InvalidVersion {
            pack: self.identifier.clone(),
            version: self.version.clone(),
            source,
        })?;

        let prefix = format!("{}.", self.identifier);
        let mut component_ids = BTreeSet::new();
        for component in &self.components {
            if let Some(declared) = component
                .pack_identifier
                .as_ref()
                .filter(|declared| **declared != self.identifier)
            {
                return Err(Error::ComponentPackMismatch {
                    id: component.id.clone(),
                    declared: declared.clone(),
                    pack: self.identifier.clone(),
                });
            }
            if !component.id.starts_with(&prefix) || component.id.len() == prefix.len() {
                return Err(Error::InvalidComponentId {
                    id: component.id.clone(),
                    pack: self.identifier.clone(),
                });
            }
            if !component_ids.insert(component.id.as_str()) {
                return Err(Error::DuplicateComponent {
                    id: component.id.clone(),
                    first: self.identifier.clone(),
                    second: self.identifier.clone(),
                });
            }
        }

        let mut section_ids = BTreeSet::new();
        for template in &self.templates {
            if !section_ids.insert(template.section_id.as_str()) {
                return Err(Error::DuplicateSection {
                    id: template.section_id.clone(),
                    first: self.identifier.clone(),
                    second: self.identifier.clone(),
                });
            }
        }
        Ok(())
    }

    /// Whether the manifest declares anything beyond its identity.
    pub fn declares_content(&self) -> bool {
        !self.components.is_empty()
            || !self.templates.is_empty()
            || !self.checks.is_empty()
            || !self.hook_fragments.is_empty()
            || self.configure_project.is_some()
    }
}

/// A template contribution as declared: inline text or a pack-relative file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    pub section_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_file: Option<String>,
    /// Placeholder tokens the template expects, e.g. `__REPO_NAME__`.
    #[serde(default)]
    pub placeholders: Vec<String>,
}

impl TemplateSource {
    pub fn inline(section_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            content: Some(content.into()),
            content_file: None,
            placeholders: Vec::new(),
        }
    }

    pub fn file(section_id: impl Into<String>, content_file: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            content: None,
            content_file: Some(content_file.into()),
            placeholders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Input,
    Select,
    /// The value comes from running `command`.
    Script,
}

/// A value the pack asks for at configure time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub key: String,
    pub kind: PromptKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
}

/// Which scopes a supplementary check applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckScope {
    Global,
    Project,
    #[default]
    Any,
}

/// A pack-declared doctor check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementaryCheck {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub fix_command: Option<String>,
    #[serde(default)]
    pub scope: CheckScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureProject {
    /// Pack-relative script run once per project.
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookFragment {
    pub event: String,
    /// Pack-relative shell fragment.
    pub file: String,
}

/// A resolved template: its text is loaded and ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContribution {
    pub section_id: String,
    pub template: String,
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackSource {
    BuiltIn,
    External { root: PathBuf },
}

/// A usable pack: manifest plus loaded templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    pub manifest: PackManifest,
    pub templates: Vec<TemplateContribution>,
    pub source: PackSource,
}

impl Pack {
    /// Build a built-in pack. Templates must be inline.
    pub fn builtin(manifest: PackManifest) -> Result<Self> {
        manifest.validate()?;
        let templates = manifest
            .templates
            .iter()
            .map(|t| match &t.content {
                Some(text) => Ok(TemplateContribution {
                    section_id: t.section_id.clone(),
                    template: text.clone(),
                    placeholders: t.placeholders.clone(),
                }),
                None => Err(Error::MissingTemplateContent {
                    pack: manifest.identifier.clone(),
                    section: t.section_id.clone(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            manifest,
            templates,
            source: PackSource::BuiltIn,
        })
    }

    /// Assemble a pack whose templates were loaded elsewhere.
    pub fn from_parts(
        manifest: PackManifest,
        templates: Vec<TemplateContribution>,
        source: PackSource,
    ) -> Self {
        Self {
            manifest,
            templates,
            source,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.manifest.identifier
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn components(&self) -> &[Component] {
        &self.manifest.components
    }

    pub fn is_external(&self) -> bool {
        matches!(self.source, PackSource::External { .. })
    }

    pub fn declares_package(&self, name: &str) -> bool {
        self.components()
            .iter()
            .any(|c| c.install_action.package_name() == Some(name))
    }

    pub fn declares_plugin(&self, name: &str) -> bool {
        self.components().iter().any(|c| {
            c.install_action
                .plugin_name()
                .is_some_and(|declared| plugin_names_match(declared, name))
        })
    }

    pub fn declares_service_entry(&self, name: &str) -> bool {
        self.components().iter().any(|c| {
            c.install_action
                .service_entry()
                .is_some_and(|entry| entry.name == name)
        })
    }
}
