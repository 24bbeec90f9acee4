//! Trust boundary for pack content.
//!
//! - [`loader`]: load external packs, dropping any artifact whose declared
//!   path resolves outside the pack directory
//! - [`scripts`]: enumerate and hash everything a pack could execute
//! - [`store`]: persisted record of what the user trusted
//! - [`runner`]: the script execution contract and its shell implementation

pub mod error;
pub mod loader;
pub mod runner;
pub mod scripts;
pub mod store;

pub use error::{Error, Result};
pub use loader::{ArtifactKind, LoadedPack, RejectedArtifact, load_external_pack};
pub use runner::{ScriptOutput, ScriptRunner, ShellRunner};
pub use scripts::{
    INLINE_KEY_PREFIX, ScriptItem, ScriptKind, analyze_scripts, detect_new_scripts, hash_items,
    verify_trust,
};
pub use store::{TrustRecord, TrustStore};
