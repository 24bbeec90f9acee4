//! Normalized path handling for cross-platform compatibility

use std::path::Path;

/// A path normalized to use forward slashes internally.
///
/// Dot segments are resolved lexically on construction, so two spellings of
/// the same location (`a/./b`, `a/c/../b`) compare equal. Leading `..`
/// segments of a relative path are dropped: a normalized relative path can
/// never point above its base. Containment against the real filesystem
/// (symlinks included) is the job of [`crate::sandbox`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        Self {
            inner: normalize(&raw),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Whether the path starts at a filesystem root.
    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/') || has_drive_prefix(&self.inner)
    }
}

fn has_drive_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn normalize(raw: &str) -> String {
    let absolute = raw.starts_with('/');
    let (drive, body) = if has_drive_prefix(raw) {
        raw.split_at(2)
    } else {
        ("", raw)
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in body.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute || body.starts_with('/') {
        format!("{}/{}", drive, joined)
    } else {
        format!("{}{}", drive, joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(NormalizedPath::new("a\\b\\c.md").as_str(), "a/b/c.md");
    }

    #[test]
    fn dot_segments_are_resolved() {
        assert_eq!(NormalizedPath::new("a/./b/../c").as_str(), "a/c");
        assert_eq!(NormalizedPath::new("/a/b/../../c").as_str(), "/c");
    }

    #[test]
    fn leading_parent_segments_are_dropped_for_relative_paths() {
        assert_eq!(NormalizedPath::new("../outside.txt").as_str(), "outside.txt");
        assert_eq!(NormalizedPath::new("a/../../b").as_str(), "b");
    }

    #[test]
    fn absolute_forms_are_detected() {
        assert!(NormalizedPath::new("/etc/passwd").is_absolute());
        assert!(NormalizedPath::new("C:\\Users\\me").is_absolute());
        assert!(!NormalizedPath::new("skills/a.md").is_absolute());
    }
}
