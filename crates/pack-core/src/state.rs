//! Per-scope persisted state
//!
//! Each scope owns one JSON state file recording which packs are configured
//! there, exactly what each pack's installation created, and the placeholder
//! values used to render templates. Updates only ever merge: recording a
//! pack or its artifacts never drops unrelated entries. Entries disappear
//! only through [`ScopeState::remove_pack`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use pack_fs::ConfigStore;
use pack_fs::io::read_optional_text;
use pack_meta::{ServiceScope, plugin_names_match};
use serde::{Deserialize, Serialize};

use crate::config::TOOL_VERSION;
use crate::refcount::Resource;
use crate::{Error, Result};

/// A service entry created by an installation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntryRef {
    pub name: String,
    pub scope: ServiceScope,
}

/// What installing one pack in one scope produced.
///
/// Only artifacts this installation created belong here; anything that
/// already existed must be left out so removal never deletes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactRecord {
    pub service_entries: Vec<ServiceEntryRef>,
    /// Scope-relative paths of copied files.
    pub files: Vec<String>,
    pub template_sections: Vec<String>,
    pub shell_hook_commands: Vec<String>,
    pub settings_key_paths: Vec<String>,
    pub package_names: Vec<String>,
    pub plugin_names: Vec<String>,
}

impl ArtifactRecord {
    pub fn is_empty(&self) -> bool {
        self.service_entries.is_empty()
            && self.files.is_empty()
            && self.template_sections.is_empty()
            && self.shell_hook_commands.is_empty()
            && self.settings_key_paths.is_empty()
            && self.package_names.is_empty()
            && self.plugin_names.is_empty()
    }

    /// Union `other` into `self`, keeping first-seen order.
    pub fn merge(&mut self, other: ArtifactRecord) {
        merge_unique(&mut self.service_entries, other.service_entries);
        merge_unique(&mut self.files, other.files);
        merge_unique(&mut self.template_sections, other.template_sections);
        merge_unique(&mut self.shell_hook_commands, other.shell_hook_commands);
        merge_unique(&mut self.settings_key_paths, other.settings_key_paths);
        merge_unique(&mut self.package_names, other.package_names);
        merge_unique(&mut self.plugin_names, other.plugin_names);
    }

    pub fn contains_resource(&self, resource: &Resource) -> bool {
        match resource {
            Resource::Package(name) => self.package_names.iter().any(|p| p == name),
            Resource::Plugin(name) => self.plugin_names.iter().any(|p| plugin_names_match(p, name)),
            Resource::ServiceEntry(name) => self.service_entries.iter().any(|s| &s.name == name),
        }
    }

    /// Shared resources this record owns, in a stable order.
    pub fn resources(&self) -> Vec<Resource> {
        self.package_names
            .iter()
            .cloned()
            .map(Resource::Package)
            .chain(self.plugin_names.iter().cloned().map(Resource::Plugin))
            .chain(
                self.service_entries
                    .iter()
                    .map(|s| Resource::ServiceEntry(s.name.clone())),
            )
            .collect()
    }
}

fn merge_unique<T: PartialEq>(into: &mut Vec<T>, items: Vec<T>) {
    for item in items {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Persisted state of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeState {
    pub tool_version: String,
    #[serde(default)]
    pub configured_packs: BTreeSet<String>,
    #[serde(default)]
    pub per_pack_artifacts: BTreeMap<String, ArtifactRecord>,
    #[serde(default)]
    pub resolved_values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
}

impl Default for ScopeState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeState {
    pub fn new() -> Self {
        Self {
            tool_version: TOOL_VERSION.to_string(),
            configured_packs: BTreeSet::new(),
            per_pack_artifacts: BTreeMap::new(),
            resolved_values: BTreeMap::new(),
            last_synced: None,
        }
    }

    /// Load state from `path`.
    ///
    /// A missing file is a fresh, empty state. A file that exists but does
    /// not parse is [`Error::MalformedState`], and one written by a newer
    /// major version is [`Error::IncompatibleToolVersion`].
    pub fn load(path: &Path) -> Result<Self> {
        let Some(text) = read_optional_text(path)? else {
            tracing::debug!(path = %path.display(), "no state file; starting fresh");
            return Ok(Self::new());
        };
        let state: ScopeState = serde_json::from_str(&text).map_err(|e| Error::MalformedState {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        check_compatible(path, &state.tool_version)?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        tracing::debug!(path = %path.display(), packs = self.configured_packs.len(), "saved state");
        Ok(())
    }

    pub fn record_pack(&mut self, pack_id: &str) {
        if self.configured_packs.insert(pack_id.to_string()) {
            tracing::info!(pack = %pack_id, "recorded pack");
        }
        self.tool_version = TOOL_VERSION.to_string();
    }

    pub fn is_configured(&self, pack_id: &str) -> bool {
        self.configured_packs.contains(pack_id)
    }

    /// Merge `record` into the pack's existing record.
    pub fn record_artifacts(&mut self, pack_id: &str, record: ArtifactRecord) {
        self.per_pack_artifacts
            .entry(pack_id.to_string())
            .or_default()
            .merge(record);
    }

    pub fn artifacts(&self, pack_id: &str) -> Option<&ArtifactRecord> {
        self.per_pack_artifacts.get(pack_id)
    }

    /// Merge placeholder values; later values win for the same key.
    pub fn set_resolved_values(&mut self, values: &BTreeMap<String, String>) {
        self.resolved_values
            .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Drop a pack and return its artifact record.
    pub fn remove_pack(&mut self, pack_id: &str) -> Option<ArtifactRecord> {
        let was_configured = self.configured_packs.remove(pack_id);
        let record = self.per_pack_artifacts.remove(pack_id);
        if was_configured {
            tracing::info!(pack = %pack_id, "removed pack from state");
        }
        record.or(was_configured.then(ArtifactRecord::default))
    }

    pub fn touch(&mut self) {
        self.last_synced = Some(Utc::now());
    }
}

fn check_compatible(path: &Path, found: &str) -> Result<()> {
    let malformed = |message: String| Error::MalformedState {
        path: path.to_path_buf(),
        message,
    };
    let found_version = semver::Version::parse(found)
        .map_err(|e| malformed(format!("invalid toolVersion '{}': {}", found, e)))?;
    let running = semver::Version::parse(TOOL_VERSION)
        .map_err(|e| malformed(format!("invalid running version: {}", e)))?;
    if found_version.major > running.major {
        return Err(Error::IncompatibleToolVersion {
            path: path.to_path_buf(),
            found: found.to_string(),
            running: TOOL_VERSION.to_string(),
        });
    }
    Ok(())
}
