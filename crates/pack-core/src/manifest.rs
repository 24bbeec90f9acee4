//! Content-hash ledger for copied files
//!
//! The manifest is a line-oriented text file:
//!
//! ```text
//! # comments and blank lines are ignored
//! @source_directory=/Users/me/packs/ios
//! @installed_packs=ios,web
//! @installed_components=ios.lsp,web.eslint
//! skills/xcode.md=3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b
//! ```
//!
//! Metadata lines start with `@`; every other non-comment line maps a
//! scope-relative path to the SHA-256 of the file as it was installed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use pack_fs::NormalizedPath;
use pack_fs::checksum::{is_sha256_hex, sha256_file};
use pack_fs::io::{read_optional_text, write_text};

use crate::{Error, Result};

const SOURCE_DIRECTORY_KEY: &str = "@source_directory";
const INSTALLED_PACKS_KEY: &str = "@installed_packs";
const INSTALLED_COMPONENTS_KEY: &str = "@installed_components";

/// State of one tracked file relative to its recorded hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Unchanged,
    /// Present but hashing differently: hand-edited since install.
    Modified,
    Missing,
    /// Not in the manifest.
    Untracked,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
    source_directory: Option<String>,
    installed_packs: BTreeSet<String>,
    installed_components: BTreeSet<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        match read_optional_text(path)? {
            Some(text) => Self::parse(path, &text),
            None => Ok(Self::new()),
        }
    }

    /// Parse manifest text. `path` is only used in error messages.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut manifest = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = |message: &str| Error::MalformedManifest {
                path: path.to_path_buf(),
                line: idx + 1,
                message: message.to_string(),
            };
            let (key, value) = line.split_once('=').ok_or_else(|| malformed("expected key=value"))?;

            match key {
                SOURCE_DIRECTORY_KEY => {
                    manifest.source_directory = Some(value.to_string()).filter(|v| !v.is_empty());
                }
                INSTALLED_PACKS_KEY => manifest.installed_packs = split_list(value),
                INSTALLED_COMPONENTS_KEY => manifest.installed_components = split_list(value),
                k if k.starts_with('@') => return Err(malformed("unknown metadata key")),
                _ => {
                    if !is_sha256_hex(value) {
                        return Err(malformed("value is not a SHA-256 hex digest"));
                    }
                    let key = validate_relative(key).map_err(|_| malformed("invalid path"))?;
                    manifest.entries.insert(key, value.to_string());
                }
            }
        }
        Ok(manifest)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(dir) = &self.source_directory {
            let _ = writeln!(out, "{}={}", SOURCE_DIRECTORY_KEY, dir);
        }
        let _ = writeln!(out, "{}={}", INSTALLED_PACKS_KEY, join_list(&self.installed_packs));
        let _ = writeln!(
            out,
            "{}={}",
            INSTALLED_COMPONENTS_KEY,
            join_list(&self.installed_components)
        );
        for (path, hash) in &self.entries {
            let _ = writeln!(out, "{}={}", path, hash);
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_text(path, &self.render())?;
        Ok(())
    }

    /// Start an install run.
    ///
    /// The source directory is replaced; packs and components are added to
    /// those already recorded. File hashes are untouched.
    pub fn begin_run<P, C>(&mut self, source_directory: Option<&str>, packs: P, components: C)
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        if let Some(dir) = source_directory {
            self.source_directory = Some(dir.to_string());
        }
        self.installed_packs.extend(packs.into_iter().map(Into::into));
        self.installed_components
            .extend(components.into_iter().map(Into::into));
    }

    /// Hash the file at `absolute` and record it under `relative`.
    pub fn record_file(&mut self, relative: &str, absolute: &Path) -> Result<String> {
        let hash = sha256_file(absolute)?;
        self.record_hash(relative, &hash)?;
        Ok(hash)
    }

    pub fn record_hash(&mut self, relative: &str, hash: &str) -> Result<()> {
        let key = validate_relative(relative)?;
        if !is_sha256_hex(hash) {
            return Err(Error::InvalidHash {
                path: relative.to_string(),
                hash: hash.to_string(),
            });
        }
        tracing::debug!(path = %key, "recorded file hash");
        self.entries.insert(key, hash.to_string());
        Ok(())
    }

    /// Stop tracking `relative`. Returns whether it was tracked.
    pub fn forget(&mut self, relative: &str) -> bool {
        match validate_relative(relative) {
            Ok(key) => self.entries.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn forget_pack(&mut self, pack_id: &str) {
        self.installed_packs.remove(pack_id);
        let prefix = format!("{}.", pack_id);
        self.installed_components.retain(|c| !c.starts_with(&prefix));
    }

    pub fn hash(&self, relative: &str) -> Option<&str> {
        let key = validate_relative(relative).ok()?;
        self.entries.get(&key).map(String::as_str)
    }

    /// Compare the file under `root` against its recorded hash.
    pub fn check_file(&self, relative: &str, root: &Path) -> Result<FileStatus> {
        let Some(expected) = self.hash(relative) else {
            return Ok(FileStatus::Untracked);
        };
        let absolute = root.join(relative);
        if !absolute.is_file() {
            return Ok(FileStatus::Missing);
        }
        let current = sha256_file(&absolute)?;
        Ok(if current == expected {
            FileStatus::Unchanged
        } else {
            FileStatus::Modified
        })
    }

    /// Every tracked file that is modified or missing under `root`.
    pub fn drifted_files(&self, root: &Path) -> Result<Vec<(String, FileStatus)>> {
        let mut drifted = Vec::new();
        for path in self.entries.keys() {
            let status = self.check_file(path, root)?;
            if matches!(status, FileStatus::Modified | FileStatus::Missing) {
                drifted.push((path.clone(), status));
            }
        }
        Ok(drifted)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn source_directory(&self) -> Option<&str> {
        self.source_directory.as_deref()
    }

    pub fn installed_packs(&self) -> &BTreeSet<String> {
        &self.installed_packs
    }

    pub fn installed_components(&self) -> &BTreeSet<String> {
        &self.installed_components
    }
}

/// Normalize a manifest key and reject anything that could not round-trip
/// through the line format or that points outside the scope.
fn validate_relative(relative: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidManifestPath {
        path: relative.to_string(),
        reason: reason.to_string(),
    };
    if relative.contains(['=', '\n', '\r']) {
        return Err(invalid("contains '=' or a line break"));
    }
    let raw = relative.replace('\\', "/");
    if raw.split('/').any(|segment| segment == "..") {
        return Err(invalid("contains '..'"));
    }
    let normalized = NormalizedPath::new(PathBuf::from(&raw));
    if normalized.is_absolute() {
        return Err(invalid("must be relative"));
    }
    let key = normalized.as_str().to_string();
    if key.is_empty() || key.starts_with('@') || key.starts_with('#') {
        return Err(invalid("empty or reserved"));
    }
    Ok(key)
}

fn split_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn join_list(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    const HASH: &str = "3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b";

    #[test]
    fn parse_and_render_roundtrip() {
        let text = format!(
            "# header\n\n@source_directory=/packs/ios\n@installed_packs=web,ios\n\
             @installed_components=ios.lsp\nskills/a.md={HASH}\n"
        );
        let manifest = Manifest::parse(Path::new("manifest"), &text).unwrap();
        assert_eq!(manifest.source_directory(), Some("/packs/ios"));
        assert_eq!(manifest.installed_packs().len(), 2);
        assert_eq!(manifest.hash("skills/a.md"), Some(HASH));

        let again = Manifest::parse(Path::new("manifest"), &manifest.render()).unwrap();
        assert_eq!(again, manifest);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = Manifest::parse(Path::new("m"), "@installed_packs=a\nnot a pair\n").unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { line: 2, .. }));
    }

    #[test]
    fn bad_hash_is_malformed() {
        assert!(Manifest::parse(Path::new("m"), "a.md=xyz\n").is_err());
    }

    #[test]
    fn begin_run_preserves_prior_entries() {
        let mut manifest = Manifest::new();
        manifest.begin_run(Some("/old"), ["ios"], ["ios.lsp"]);
        manifest.record_hash("a.md", HASH).unwrap();

        manifest.begin_run(Some("/new"), ["web"], ["web.lint"]);

        assert_eq!(manifest.source_directory(), Some("/new"));
        assert!(manifest.installed_packs().contains("ios"));
        assert!(manifest.installed_packs().contains("web"));
        assert!(manifest.installed_components().contains("ios.lsp"));
        assert_eq!(manifest.hash("a.md"), Some(HASH));
    }

    #[test]
    fn rejects_escaping_and_reserved_paths() {
        let mut manifest = Manifest::new();
        for bad in ["../x", "/abs", "@meta", "a=b", "a/../../b"] {
            assert!(manifest.record_hash(bad, HASH).is_err(), "{bad}");
        }
    }

    #[test]
    fn check_file_detects_edits() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("skills")).unwrap();
        fs::write(dir.path().join("skills/a.md"), "v1").unwrap();

        let mut manifest = Manifest::new();
        manifest.record_file("skills/a.md", &dir.path().join("skills/a.md")).unwrap();
        assert_eq!(manifest.check_file("skills/a.md", dir.path()).unwrap(), FileStatus::Unchanged);

        fs::write(dir.path().join("skills/a.md"), "v2").unwrap();
        assert_eq!(manifest.check_file("skills/a.md", dir.path()).unwrap(), FileStatus::Modified);
        assert_eq!(manifest.check_file("other.md", dir.path()).unwrap(), FileStatus::Untracked);

        fs::remove_file(dir.path().join("skills/a.md")).unwrap();
        assert_eq!(
            manifest.drifted_files(dir.path()).unwrap(),
            vec![("skills/a.md".to_string(), FileStatus::Missing)]
        );
    }

    #[test]
    fn forget_pack_drops_its_components() {
        let mut manifest = Manifest::new();
        manifest.begin_run(None, ["ios", "web"], ["ios.lsp", "web.lint"]);
        manifest.forget_pack("ios");
        assert!(!manifest.installed_packs().contains("ios"));
        assert_eq!(manifest.installed_components().len(), 1);
    }
}
