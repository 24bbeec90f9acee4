//! Engine configuration and on-disk layout
//!
//! Global state lives under one home directory:
//!
//! ```text
//! ~/.packs/                  (or $PACK_HOME)
//! ├── config.toml            optional overrides
//! ├── global-state.json      state of the global scope
//! ├── index.json             scope -> configured packs
//! ├── manifest               copied-file hashes for the global scope
//! ├── trusted-packs.json     trust store
//! ├── AGENTS.md              generated file of the global scope
//! └── .lock                  engine lock
//! ```
//!
//! A project keeps its state in `<project>/.packs/` and its generated file
//! at `<project>/AGENTS.local.md`.
//!
//! There is one manifest per scope rather than a single global one: each
//! project has `<project>/.packs/manifest`, and `home/manifest` only covers
//! the global scope. Manifest paths are relative to the scope root, so one
//! shared file would mix entries from unrelated roots.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pack_fs::ConfigStore;
use serde::Deserialize;

use crate::{Error, Result};

/// Version of this tool, written into every state file.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "PACK_HOME";

/// Default generated file name in project scopes.
pub const DEFAULT_GENERATED_FILE: &str = "AGENTS.local.md";

/// Generated file name in the global scope.
pub const GLOBAL_GENERATED_FILE: &str = "AGENTS.md";

/// Per-project state directory.
pub const PROJECT_STATE_DIR: &str = ".packs";

pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 30;

/// Optional overrides read from `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    generated_file_name: Option<String>,
    script_timeout_secs: Option<u64>,
}

/// Resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    home: PathBuf,
    generated_file_name: String,
    script_timeout: Duration,
}

impl EngineConfig {
    /// Resolve the home directory from `PACK_HOME` or `~/.packs` and load
    /// overrides.
    pub fn from_env() -> Result<Self> {
        let home = resolve_home(std::env::var_os(HOME_ENV).map(PathBuf::from), dirs::home_dir())
            .ok_or(Error::NoHomeDirectory)?;
        Self::with_home(home)
    }

    /// Use `home` as the home directory and load `home/config.toml` if
    /// present. A malformed config file is an error.
    pub fn with_home(home: impl Into<PathBuf>) -> Result<Self> {
        let home = home.into();
        let overrides: ConfigFile = ConfigStore::new()
            .load_optional(&home.join("config.toml"))?
            .unwrap_or_default();

        let config = Self {
            generated_file_name: overrides
                .generated_file_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GENERATED_FILE.to_string()),
            script_timeout: Duration::from_secs(
                overrides
                    .script_timeout_secs
                    .unwrap_or(DEFAULT_SCRIPT_TIMEOUT_SECS),
            ),
            home,
        };
        tracing::debug!(home = %config.home.display(), "engine config resolved");
        Ok(config)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn global_state_path(&self) -> PathBuf {
        self.home.join("global-state.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.home.join("index.json")
    }

    /// Manifest of the global scope only; see [`Self::project_manifest_path`].
    pub fn manifest_path(&self) -> PathBuf {
        self.home.join("manifest")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.home.join(".lock")
    }

    pub fn trust_store_path(&self) -> PathBuf {
        self.home.join("trusted-packs.json")
    }

    pub fn global_generated_file(&self) -> PathBuf {
        self.home.join(GLOBAL_GENERATED_FILE)
    }

    pub fn project_state_path(&self, project: &Path) -> PathBuf {
        project.join(PROJECT_STATE_DIR).join("state.json")
    }

    /// Manifest of one project, kept next to its state.
    pub fn project_manifest_path(&self, project: &Path) -> PathBuf {
        project.join(PROJECT_STATE_DIR).join("manifest")
    }

    pub fn project_generated_file(&self, project: &Path) -> PathBuf {
        project.join(&self.generated_file_name)
    }

    pub fn generated_file_name(&self) -> &str {
        &self.generated_file_name
    }

    pub fn script_timeout(&self) -> Duration {
        self.script_timeout
    }
}

/// `PACK_HOME` wins; otherwise `<user home>/.packs`.
fn resolve_home(env_home: Option<PathBuf>, user_home: Option<PathBuf>) -> Option<PathBuf> {
    env_home
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| user_home.map(|h| h.join(".packs")))
}
