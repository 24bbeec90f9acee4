//! Enumeration and hashing of everything a pack could execute.
//!
//! Each executable item gets a trust key: the pack-relative path for
//! file-backed content, or `inline:<sha256>` for text embedded in the
//! manifest. A trust record maps keys to content hashes; re-verifying it
//! against the pack on disk reveals scripts that changed since the user
//! accepted them.

use std::collections::BTreeMap;
use std::path::Path;

use pack_fs::checksum::{sha256_content, sha256_file};
use pack_fs::io::read_optional_text;
use pack_fs::resolve_contained;
use pack_meta::{CopyFileKind, InstallAction, PackManifest, PromptKind};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix of trust keys for content without a backing file.
pub const INLINE_KEY_PREFIX: &str = "inline:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptKind {
    ShellCommand,
    ServiceCommand,
    CheckCommand,
    FixCommand,
    ConfigureProject,
    HookFragment,
    /// Hook script copied into the scope by a `CopyFile` component.
    CopiedHook,
    PromptScript,
}

/// One piece of executable content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptItem {
    pub kind: ScriptKind,
    pub content: String,
    /// Pack-relative path for file-backed items.
    pub relative_path: Option<String>,
}

impl ScriptItem {
    fn inline(kind: ScriptKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            relative_path: None,
        }
    }

    /// Key identifying this item in a trust record.
    pub fn trust_key(&self) -> String {
        match &self.relative_path {
            Some(path) => path.clone(),
            None => format!("{}{}", INLINE_KEY_PREFIX, sha256_content(&self.content)),
        }
    }

    pub fn content_hash(&self) -> String {
        sha256_content(&self.content)
    }
}

/// List every executable item declared by `manifest`.
///
/// File-backed items are read through the sandbox; a path that escapes
/// `pack_path` is an error, since the pack should have been loaded through
/// [`crate::load_external_pack`] first. A missing file yields empty content.
pub fn analyze_scripts(manifest: &PackManifest, pack_path: &Path) -> Result<Vec<ScriptItem>> {
    let mut items = Vec::new();

    for component in &manifest.components {
        match &component.install_action {
            InstallAction::ShellCommand { command } => {
                items.push(ScriptItem::inline(ScriptKind::ShellCommand, command.as_str()));
            }
            InstallAction::ServiceEntry(entry) => {
                if let Some(line) = entry.command_line() {
                    items.push(ScriptItem::inline(ScriptKind::ServiceCommand, line));
                }
            }
            InstallAction::CopyFile {
                source,
                kind: CopyFileKind::Hook,
                ..
            } => {
                items.push(file_item(ScriptKind::CopiedHook, pack_path, source)?);
            }
            _ => {}
        }
    }

    for check in &manifest.checks {
        items.push(ScriptItem::inline(ScriptKind::CheckCommand, check.command.as_str()));
        if let Some(fix) = &check.fix_command {
            items.push(ScriptItem::inline(ScriptKind::FixCommand, fix.as_str()));
        }
    }

    for prompt in &manifest.prompts {
        if let (PromptKind::Script, Some(command)) = (prompt.kind, &prompt.command) {
            items.push(ScriptItem::inline(ScriptKind::PromptScript, command.as_str()));
        }
    }

    if let Some(configure) = &manifest.configure_project {
        items.push(file_item(ScriptKind::ConfigureProject, pack_path, &configure.script)?);
    }
    for fragment in &manifest.hook_fragments {
        items.push(file_item(ScriptKind::HookFragment, pack_path, &fragment.file)?);
    }

    tracing::debug!(pack = %manifest.identifier, count = items.len(), "analyzed pack scripts");
    Ok(items)
}

fn file_item(kind: ScriptKind, pack_path: &Path, relative: &str) -> Result<ScriptItem> {
    let resolved = resolve_contained(pack_path, relative).map_err(Error::from_sandbox)?;
    let content = read_optional_text(&resolved)?.unwrap_or_default();
    Ok(ScriptItem {
        kind,
        content,
        relative_path: Some(relative.to_string()),
    })
}

/// Trust key to content hash for each item.
pub fn hash_items(items: &[ScriptItem]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|item| (item.trust_key(), item.content_hash()))
        .collect()
}

/// Relative paths in `trusted_hashes` whose file is missing, escapes the
/// pack, or no longer hashes to the recorded value. Inline keys are skipped.
pub fn verify_trust(trusted_hashes: &BTreeMap<String, String>, pack_path: &Path) -> Vec<String> {
    trusted_hashes
        .iter()
        .filter(|(key, _)| !key.starts_with(INLINE_KEY_PREFIX))
        .filter(|(key, expected)| {
            let current = resolve_contained(pack_path, key)
                .ok()
                .and_then(|path| sha256_file(&path).ok());
            match current {
                Some(hash) => &hash != *expected,
                None => true,
            }
        })
        .map(|(key, _)| {
            tracing::warn!(path = %key, "trusted script changed or disappeared");
            key.clone()
        })
        .collect()
}

/// Items of the updated pack that the user has not trusted in their current
/// form: new keys, or file-backed items whose hash changed.
pub fn detect_new_scripts(
    current_hashes: &BTreeMap<String, String>,
    updated_pack_path: &Path,
    manifest: &PackManifest,
) -> Result<Vec<ScriptItem>> {
    let items = analyze_scripts(manifest, updated_pack_path)?;
    Ok(items
        .into_iter()
        .filter(|item| current_hashes.get(&item.trust_key()) != Some(&item.content_hash()))
        .collect())
}
