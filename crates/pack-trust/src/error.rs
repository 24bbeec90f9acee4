use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while loading, trusting or running pack content.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A pack-declared path resolves outside the pack root.
    #[error("'{path}' escapes pack root {root}")]
    PathEscape { root: PathBuf, path: String },

    /// Every declared artifact of the pack was rejected.
    #[error("pack '{pack}' declares no content inside its own directory")]
    EntirePackEscapes { pack: String },

    /// A script ran longer than the caller allowed and was killed.
    #[error("command '{command}' timed out after {}s", .timeout.as_secs_f64())]
    ScriptTimeout { command: String, timeout: Duration },

    /// The shell could not be started.
    #[error("failed to run '{command}': {source}")]
    ScriptSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The pack has no entry in the trust store.
    #[error("pack '{pack}' has not been trusted")]
    NotTrusted { pack: String },

    #[error(transparent)]
    Fs(#[from] pack_fs::Error),

    #[error(transparent)]
    Meta(#[from] pack_meta::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map a sandbox failure from `pack-fs` into this crate's vocabulary.
    pub(crate) fn from_sandbox(err: pack_fs::Error) -> Self {
        match err {
            pack_fs::Error::PathEscape { root, path } => Self::PathEscape { root, path },
            other => Self::Fs(other),
        }
    }
}
