//! Process-wide mutual exclusion for state-changing operations

use std::path::Path;

use pack_fs::LockFile;

use crate::{Error, Result};

/// Held for the duration of a converge, repair or removal.
///
/// Acquisition never blocks: if another process holds the lock the caller
/// gets [`Error::LockContention`] at once.
#[derive(Debug)]
pub struct EngineLock {
    file: LockFile,
}

impl EngineLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        match LockFile::try_acquire(path) {
            Ok(file) => Ok(Self { file }),
            Err(pack_fs::Error::LockHeld { path }) => {
                tracing::warn!(path = %path.display(), "engine lock is held by another process");
                Err(Error::LockContention { path })
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
