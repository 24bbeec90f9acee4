//! Persisted record of packs whose scripts the user accepted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pack_fs::ConfigStore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scripts::{ScriptItem, hash_items, verify_trust};

/// What was trusted for one pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustRecord {
    pub version: String,
    pub trusted_at: DateTime<Utc>,
    /// Trust key to SHA-256 of the content.
    pub hashes: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrustFile {
    #[serde(default)]
    packs: BTreeMap<String, TrustRecord>,
}

/// JSON-backed trust store.
#[derive(Debug)]
pub struct TrustStore {
    path: PathBuf,
    packs: BTreeMap<String, TrustRecord>,
}

impl TrustStore {
    /// Load the store; a missing file is an empty store, a corrupt one is
    /// an error.
    pub fn load(path: &Path) -> Result<Self> {
        let file: TrustFile = ConfigStore::new().load_optional(path)?.unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            packs: file.packs,
        })
    }

    pub fn save(&self) -> Result<()> {
        let file = TrustFile {
            packs: self.packs.clone(),
        };
        ConfigStore::new().save(&self.path, &file)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `items` as trusted for `pack_id`, replacing any earlier record.
    pub fn trust(&mut self, pack_id: &str, version: &str, items: &[ScriptItem]) {
        tracing::info!(pack = %pack_id, version, scripts = items.len(), "trusted pack scripts");
        self.packs.insert(
            pack_id.to_string(),
            TrustRecord {
                version: version.to_string(),
                trusted_at: Utc::now(),
                hashes: hash_items(items),
            },
        );
    }

    pub fn record(&self, pack_id: &str) -> Option<&TrustRecord> {
        self.packs.get(pack_id)
    }

    pub fn is_trusted(&self, pack_id: &str) -> bool {
        self.packs.contains_key(pack_id)
    }

    /// Trusted file-backed scripts of `pack_id` that changed on disk.
    ///
    /// # Errors
    ///
    /// [`Error::NotTrusted`] when the pack has no record.
    pub fn verify(&self, pack_id: &str, pack_path: &Path) -> Result<Vec<String>> {
        let record = self.packs.get(pack_id).ok_or_else(|| Error::NotTrusted {
            pack: pack_id.to_string(),
        })?;
        Ok(verify_trust(&record.hashes, pack_path))
    }

    /// Forget `pack_id`. Returns whether a record existed.
    pub fn revoke(&mut self, pack_id: &str) -> bool {
        let removed = self.packs.remove(pack_id).is_some();
        if removed {
            tracing::info!(pack = %pack_id, "revoked pack trust");
        }
        removed
    }
}
