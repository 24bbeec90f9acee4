//! Filesystem primitives for the pack convergence engine
//!
//! Provides normalized relative paths, sandbox containment checks,
//! content hashing, atomic writes and the exclusive engine lock file.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod lock;
pub mod path;
pub mod sandbox;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use lock::LockFile;
pub use path::NormalizedPath;
pub use sandbox::resolve_contained;
