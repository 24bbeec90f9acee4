//! Containment checks for paths declared by untrusted packs
//!
//! A pack may only reference files inside its own root directory. The check
//! is physical, not lexical: every existing component is canonicalized so a
//! symlink whose target lies outside the root is caught, and components that
//! do not exist yet are applied lexically on top of the last real directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Resolve `relative` against `root`, failing with [`Error::PathEscape`] when
/// the result lies outside `root`.
///
/// Absolute inputs are always rejected, as are dangling symlinks (their
/// target cannot be checked).
pub fn resolve_contained(root: &Path, relative: &str) -> Result<PathBuf> {
    let canonical_root = dunce::canonicalize(root).map_err(|e| Error::io(root, e))?;
    let escape = || Error::PathEscape {
        root: canonical_root.clone(),
        path: relative.to_string(),
    };

    let requested = Path::new(relative);
    if requested.is_absolute() || requested.has_root() {
        return Err(escape());
    }

    let mut current = canonical_root.clone();
    for component in requested.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                current.pop();
            }
            Component::Normal(name) => {
                let next = current.join(name);
                match std::fs::symlink_metadata(&next) {
                    Ok(_) => {
                        current = match dunce::canonicalize(&next) {
                            Ok(resolved) => resolved,
                            Err(e) if e.kind() == ErrorKind::NotFound => {
                                tracing::debug!(path = %next.display(), "dangling symlink in pack path");
                                return Err(escape());
                            }
                            Err(e) => return Err(Error::io(&next, e)),
                        };
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => current = next,
                    Err(e) => return Err(Error::io(&next, e)),
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }

    if current.starts_with(&canonical_root) {
        Ok(current)
    } else {
        Err(escape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn plain_relative_file_is_contained() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("template.md"), "hi").unwrap();

        let resolved = resolve_contained(dir.path(), "template.md").unwrap();
        assert!(resolved.ends_with("template.md"));
    }

    #[test]
    fn missing_file_inside_root_is_contained() {
        let dir = tempdir().unwrap();
        assert!(resolve_contained(dir.path(), "not/yet/here.sh").is_ok());
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack");
        fs::create_dir(&pack).unwrap();
        fs::write(dir.path().join("secret.md"), "secret").unwrap();

        let err = resolve_contained(&pack, "../secret.md").unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));
    }

    #[test]
    fn traversal_that_returns_inside_is_allowed() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("hooks")).unwrap();
        assert!(resolve_contained(dir.path(), "hooks/../hooks/start.sh").is_ok());
    }

    #[test]
    fn absolute_path_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(resolve_contained(dir.path(), "/etc/passwd").is_err());
    }

    #[test]
    #[cfg(unix)]
    fn symlink_escaping_root_is_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let pack = dir.path().join("pack");
        fs::create_dir(&pack).unwrap();
        let outside = dir.path().join("outside.md");
        fs::write(&outside, "outside").unwrap();
        symlink(&outside, pack.join("inner.md")).unwrap();

        let err = resolve_contained(&pack, "inner.md").unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn symlink_within_root_is_allowed() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("real.md"), "real").unwrap();
        symlink(dir.path().join("real.md"), dir.path().join("alias.md")).unwrap();

        let resolved = resolve_contained(dir.path(), "alias.md").unwrap();
        assert!(resolved.ends_with("real.md"));
    }

    #[test]
    #[cfg(unix)]
    fn dangling_symlink_is_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        symlink(dir.path().join("gone.md"), dir.path().join("dangling.md")).unwrap();
        assert!(resolve_contained(dir.path(), "dangling.md").is_err());
    }
}
