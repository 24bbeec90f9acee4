//! Exclusive, non-blocking lock files
//!
//! Only one process may converge state at a time. Acquisition never waits:
//! if another process holds the lock the caller gets [`Error::LockHeld`]
//! immediately and is expected to tell the user to retry.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// An acquired advisory lock; released when dropped.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Try to take the exclusive lock at `path`, creating the file if needed.
    pub fn try_acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io(path, e))?;

        if let Err(e) = file.try_lock_exclusive() {
            if !is_contended(&e) {
                return Err(Error::io(path, e));
            }
            tracing::debug!(path = %path.display(), "lock already held");
            return Err(Error::LockHeld {
                path: path.to_path_buf(),
            });
        }

        // Owner pid is informational only; the kernel lock is authoritative
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        tracing::debug!(path = %path.display(), "lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether a failed `try_lock_exclusive` means another holder, as opposed
/// to an I/O failure.
fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        tracing::debug!(path = %self.path.display(), "lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contention_counts_as_held() {
        assert!(is_contended(&fs2::lock_contended_error()));
        assert!(is_contended(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_contended(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}
