//! Error types for pack-blocks
//!
//! Text operations never fail; only the file-level wrappers do.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Filesystem error: {0}")]
    Fs(#[from] pack_fs::Error),
}
