//! Error types for pack-core

use std::path::PathBuf;

/// Result type for pack-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pack-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A state file exists but does not parse
    #[error("State file {path} is malformed: {message}")]
    MalformedState { path: PathBuf, message: String },

    /// A manifest line does not parse
    #[error("Manifest {path} is malformed at line {line}: {message}")]
    MalformedManifest {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The scope index exists but does not parse
    #[error("Index {path} is malformed: {message}")]
    MalformedIndex { path: PathBuf, message: String },

    /// Another process holds the engine lock
    #[error("Another pack operation is running (lock held at {path}); wait for it to finish and retry")]
    LockContention { path: PathBuf },

    /// A path cannot be used as a manifest key
    #[error("Invalid manifest path '{path}': {reason}")]
    InvalidManifestPath { path: String, reason: String },

    /// A hash is not 64 lowercase hex characters
    #[error("Invalid SHA-256 '{hash}' for '{path}'")]
    InvalidHash { path: String, hash: String },

    /// A pack id is not in the catalog
    #[error("Pack '{id}' not found in catalog")]
    PackNotFound { id: String },

    /// A pack is not configured in the scope being changed
    #[error("Pack '{pack}' is not configured in {scope}")]
    PackNotConfigured { pack: String, scope: String },

    /// State written by a newer, incompatible tool version
    #[error("State file {path} was written by version {found}; this is version {running}")]
    IncompatibleToolVersion {
        path: PathBuf,
        found: String,
        running: String,
    },

    /// No home directory to place global state in
    #[error("Cannot determine the home directory; set PACK_HOME")]
    NoHomeDirectory,

    /// An external installer failed
    #[error("Installing component '{component}' failed: {message}")]
    InstallFailed { component: String, message: String },

    // Transparent wrappers for underlying crate errors
    #[error(transparent)]
    Fs(#[from] pack_fs::Error),

    #[error(transparent)]
    Blocks(#[from] pack_blocks::Error),

    #[error(transparent)]
    Meta(#[from] pack_meta::Error),

    #[error(transparent)]
    Trust(#[from] pack_trust::Error),
}
