//! Global index of which scopes use which packs
//!
//! The index lets reference counting find candidate scopes without opening
//! every state file on disk. It is a JSON object mapping a scope key (a
//! project path, or [`GLOBAL_SENTINEL`]) to the sorted pack ids configured
//! there.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use pack_fs::ConfigStore;
use pack_fs::io::read_optional_text;

use crate::scope::{GLOBAL_SENTINEL, Scope};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIndex {
    path: PathBuf,
    scopes: BTreeMap<String, BTreeSet<String>>,
}

impl ProjectIndex {
    /// Load the index at `path`; a missing file is an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        let scopes = match read_optional_text(path)? {
            Some(text) => serde_json::from_str(&text).map_err(|e| Error::MalformedIndex {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            path: path.to_path_buf(),
            scopes,
        })
    }

    pub fn save(&self) -> Result<()> {
        ConfigStore::new().save(&self.path, &self.scopes)?;
        Ok(())
    }

    /// Replace the pack set of `scope`. An empty set removes the entry.
    pub fn upsert<I, S>(&mut self, scope: &Scope, packs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packs: BTreeSet<String> = packs.into_iter().map(Into::into).collect();
        if packs.is_empty() {
            self.remove_scope(scope);
        } else {
            self.scopes.insert(scope.index_key(), packs);
        }
    }

    pub fn remove_scope(&mut self, scope: &Scope) -> bool {
        self.scopes.remove(&scope.index_key()).is_some()
    }

    pub fn packs_for(&self, scope: &Scope) -> Option<&BTreeSet<String>> {
        self.scopes.get(&scope.index_key())
    }

    /// Every scope with its configured packs.
    pub fn entries(&self) -> impl Iterator<Item = (Scope, &BTreeSet<String>)> {
        self.scopes
            .iter()
            .map(|(key, packs)| (Scope::from_index_key(key), packs))
    }

    /// Scopes that list `pack_id`.
    pub fn scopes_using(&self, pack_id: &str) -> Vec<Scope> {
        self.entries()
            .filter(|(_, packs)| packs.contains(pack_id))
            .map(|(scope, _)| scope)
            .collect()
    }

    /// Drop project entries whose directory no longer exists. The global
    /// entry is never pruned. Returns the removed keys.
    pub fn prune_stale(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .scopes
            .keys()
            .filter(|key| key.as_str() != GLOBAL_SENTINEL)
            .filter(|key| !Scope::from_index_key(key).exists())
            .cloned()
            .collect();
        for key in &stale {
            self.scopes.remove(key);
            tracing::info!(scope = %key, "pruned stale scope");
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn upsert_sorts_and_empty_removes() {
        let dir = tempdir().unwrap();
        let mut index = ProjectIndex::load(&dir.path().join("index.json")).unwrap();
        index.upsert(&Scope::Global, ["web", "ios"]);
        assert_eq!(
            index.packs_for(&Scope::Global).unwrap().iter().collect::<Vec<_>>(),
            vec!["ios", "web"]
        );

        index.upsert(&Scope::Global, Vec::<String>::new());
        assert!(index.is_empty());
    }

    #[test]
    fn prune_keeps_global_and_live_projects() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("live");
        fs::create_dir_all(&live).unwrap();

        let mut index = ProjectIndex::load(&dir.path().join("index.json")).unwrap();
        index.upsert(&Scope::Global, ["core"]);
        index.upsert(&Scope::project(&live), ["ios"]);
        index.upsert(&Scope::project(dir.path().join("gone")), ["ios"]);

        let pruned = index.prune_stale();
        assert_eq!(pruned.len(), 1);
        assert!(pruned[0].ends_with("gone"));
        assert_eq!(index.len(), 2);
        assert_eq!(index.scopes_using("ios"), vec![Scope::project(&live)]);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        let mut index = ProjectIndex::load(&path).unwrap();
        index.upsert(&Scope::Global, ["core"]);
        index.save().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(GLOBAL_SENTINEL));
        assert_eq!(ProjectIndex::load(&path).unwrap(), index);
    }

    #[test]
    fn malformed_index_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(ProjectIndex::load(&path), Err(Error::MalformedIndex { .. })));
    }
}
