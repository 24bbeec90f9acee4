//! Cross-scope reference counting for shared resources
//!
//! Removing a pack from one scope may only uninstall a package, plugin or
//! service entry when no other (scope, pack) pairing still declares it. Any
//! uncertainty (an unreadable index or state file, a pack the catalog can no
//! longer load) counts as "still needed": a resource is only released after
//! every other reference has been affirmatively ruled out.

use std::fmt;

use pack_meta::{Pack, PackLookup};

use crate::config::EngineConfig;
use crate::index::ProjectIndex;
use crate::scope::Scope;
use crate::state::ScopeState;

/// A resource that may be shared between scopes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Package(String),
    /// Bare or marketplace-qualified plugin name.
    Plugin(String),
    ServiceEntry(String),
}

impl Resource {
    pub fn name(&self) -> &str {
        match self {
            Self::Package(n) | Self::Plugin(n) | Self::ServiceEntry(n) => n,
        }
    }

    /// Whether the pack's components produce this resource.
    pub fn declared_by(&self, pack: &Pack) -> bool {
        match self {
            Self::Package(name) => pack.declares_package(name),
            Self::Plugin(name) => pack.declares_plugin(name),
            Self::ServiceEntry(name) => pack.declares_service_entry(name),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(n) => write!(f, "package '{}'", n),
            Self::Plugin(n) => write!(f, "plugin '{}'", n),
            Self::ServiceEntry(n) => write!(f, "service entry '{}'", n),
        }
    }
}

/// Why a resource is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Holder {
    /// Another pairing declares the resource.
    DeclaredBy { scope: Scope, pack: String },
    /// The scope's state could not be read.
    UnreadableState { scope: Scope, message: String },
    /// The scope configures a pack the catalog cannot load.
    UnknownPack { scope: Scope, pack: String },
    /// The index itself could not be read.
    UnreadableIndex { message: String },
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeclaredBy { scope, pack } => write!(f, "used by pack '{}' in {}", pack, scope),
            Self::UnreadableState { scope, message } => {
                write!(f, "state of {} is unreadable: {}", scope, message)
            }
            Self::UnknownPack { scope, pack } => {
                write!(f, "pack '{}' in {} cannot be loaded", pack, scope)
            }
            Self::UnreadableIndex { message } => write!(f, "index is unreadable: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    SafeToRemove,
    StillNeeded(Vec<Holder>),
}

impl Verdict {
    pub fn is_safe_to_remove(&self) -> bool {
        matches!(self, Self::SafeToRemove)
    }
}

/// Answers "is this resource still referenced elsewhere?".
pub struct ResourceReferenceCounter<'a, L: PackLookup + ?Sized> {
    config: &'a EngineConfig,
    catalog: &'a L,
}

impl<'a, L: PackLookup + ?Sized> ResourceReferenceCounter<'a, L> {
    pub fn new(config: &'a EngineConfig, catalog: &'a L) -> Self {
        Self { config, catalog }
    }

    /// Check `resource` against every (scope, pack) pairing except
    /// (`scope`, `pack_id`), the one being removed.
    pub fn check(&self, resource: &Resource, scope: &Scope, pack_id: &str) -> Verdict {
        self.check_all(std::slice::from_ref(resource), scope, pack_id)
            .pop()
            .map(|(_, verdict)| verdict)
            .unwrap_or(Verdict::SafeToRemove)
    }

    /// [`Self::check`] for several resources, loading each scope's state once.
    pub fn check_all(
        &self,
        resources: &[Resource],
        scope: &Scope,
        pack_id: &str,
    ) -> Vec<(Resource, Verdict)> {
        let mut holders: Vec<Vec<Holder>> = vec![Vec::new(); resources.len()];

        let index = match ProjectIndex::load(&self.config.index_path()) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "index unreadable; keeping shared resources");
                let holder = Holder::UnreadableIndex {
                    message: e.to_string(),
                };
                return resources
                    .iter()
                    .map(|r| (r.clone(), Verdict::StillNeeded(vec![holder.clone()])))
                    .collect();
            }
        };

        for (other_scope, packs) in index.entries() {
            if !other_scope.exists() {
                tracing::debug!(scope = %other_scope, "skipping stale scope");
                continue;
            }
            let candidates: Vec<&String> = packs
                .iter()
                .filter(|p| !(other_scope == *scope && p.as_str() == pack_id))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let state = match ScopeState::load(&other_scope.state_path(self.config)) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(scope = %other_scope, error = %e, "state unreadable; keeping shared resources");
                    for list in holders.iter_mut() {
                        list.push(Holder::UnreadableState {
                            scope: other_scope.clone(),
                            message: e.to_string(),
                        });
                    }
                    continue;
                }
            };

            for other_pack in candidates {
                if !state.is_configured(other_pack) {
                    continue;
                }
                let record = state.artifacts(other_pack);
                let catalog_pack = self.catalog.pack_by_id(other_pack);

                for (resource, list) in resources.iter().zip(holders.iter_mut()) {
                    let recorded = record.is_some_and(|r| r.contains_resource(resource));
                    let holder = match catalog_pack {
                        _ if recorded => Some(Holder::DeclaredBy {
                            scope: other_scope.clone(),
                            pack: other_pack.clone(),
                        }),
                        Some(p) if resource.declared_by(p) => Some(Holder::DeclaredBy {
                            scope: other_scope.clone(),
                            pack: other_pack.clone(),
                        }),
                        Some(_) => None,
                        None => Some(Holder::UnknownPack {
                            scope: other_scope.clone(),
                            pack: other_pack.clone(),
                        }),
                    };
                    if let Some(holder) = holder {
                        list.push(holder);
                    }
                }
            }
        }

        resources
            .iter()
            .cloned()
            .zip(holders)
            .map(|(resource, list)| {
                let verdict = if list.is_empty() {
                    Verdict::SafeToRemove
                } else {
                    Verdict::StillNeeded(list)
                };
                tracing::debug!(resource = %resource, ?verdict, "reference check");
                (resource, verdict)
            })
            .collect()
    }
}
