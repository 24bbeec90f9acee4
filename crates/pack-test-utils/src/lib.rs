//! Shared test fixtures for the pack engine workspace.
//!
//! Dev-dependency only, never published. Use it from `tests/` directories:
//! unit tests inside a crate's `src/` would see a second copy of that crate
//! and the types would not line up.
//!
//! # Modules
//!
//! - [`home`]: [`TestHome`], an isolated engine home plus project dirs
//! - [`packs`]: pack builders and a [`RecordingInstaller`]

pub mod home;
pub mod packs;

pub use home::TestHome;
pub use packs::{RecordingInstaller, catalog_of, package_pack};

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
