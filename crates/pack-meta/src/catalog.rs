//! Pack catalog: built-in and external packs keyed by identifier.
//!
//! The catalog is an ordinary value. Callers build one, pass it by
//! reference, and tests build their own; there is no process-wide default.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::schema::{Component, Pack};

/// Lookup contract the engine uses to find packs by id.
pub trait PackLookup {
    fn pack_by_id(&self, id: &str) -> Option<&Pack>;
}

/// Two registration sets; an external pack shadows a built-in of the same id.
///
/// # Example
///
/// ```
/// use pack_meta::{Pack, PackCatalog, PackLookup, PackManifest};
///
/// let mut catalog = PackCatalog::new();
/// catalog
///     .register_builtin(Pack::builtin(PackManifest::new("web", "Web", "1.0.0")).unwrap())
///     .unwrap();
/// assert!(catalog.pack_by_id("web").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackCatalog {
    builtins: BTreeMap<String, Pack>,
    external: BTreeMap<String, Pack>,
}

impl PackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in pack.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicatePack`] if a built-in with that id exists
    /// - [`Error::DuplicateComponent`] or [`Error::DuplicateSection`] if
    ///   another visible pack already declares one of its ids
    pub fn register_builtin(&mut self, pack: Pack) -> Result<()> {
        self.check_unique(&pack)?;
        Self::insert(&mut self.builtins, pack)
    }

    /// Register an externally loaded pack, shadowing any built-in of the
    /// same id.
    ///
    /// # Errors
    ///
    /// Same as [`PackCatalog::register_builtin`], for the external set.
    pub fn register_external(&mut self, pack: Pack) -> Result<()> {
        self.check_unique(&pack)?;
        if self.builtins.contains_key(pack.identifier()) {
            tracing::info!(pack = %pack.identifier(), "external pack shadows built-in");
        }
        Self::insert(&mut self.external, pack)
    }

    /// Component and section ids must be unique across packs with different
    /// identifiers. A pack shadowing one of the same id may reuse its ids.
    fn check_unique(&self, pack: &Pack) -> Result<()> {
        for other in self.packs().filter(|p| p.identifier() != pack.identifier()) {
            if let Some(c) = pack
                .components()
                .iter()
                .find(|c| other.components().iter().any(|o| o.id == c.id))
            {
                return Err(Error::DuplicateComponent {
                    id: c.id.clone(),
                    first: other.identifier().to_string(),
                    second: pack.identifier().to_string(),
                });
            }
            if let Some(t) = pack
                .templates
                .iter()
                .find(|t| other.templates.iter().any(|o| o.section_id == t.section_id))
            {
                return Err(Error::DuplicateSection {
                    id: t.section_id.clone(),
                    first: other.identifier().to_string(),
                    second: pack.identifier().to_string(),
                });
            }
        }
        Ok(())
    }

    fn insert(set: &mut BTreeMap<String, Pack>, pack: Pack) -> Result<()> {
        let id = pack.identifier().to_string();
        if set.contains_key(&id) {
            return Err(Error::DuplicatePack { id });
        }
        set.insert(id, pack);
        Ok(())
    }

    /// The visible pack for `id`.
    pub fn get(&self, id: &str) -> Option<&Pack> {
        self.external.get(id).or_else(|| self.builtins.get(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Whether `id` exists in both sets (the built-in is hidden).
    pub fn is_shadowed(&self, id: &str) -> bool {
        self.builtins.contains_key(id) && self.external.contains_key(id)
    }

    /// Visible identifiers, sorted and deduplicated.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .builtins
            .keys()
            .chain(self.external.keys())
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Visible packs in identifier order.
    pub fn packs(&self) -> impl Iterator<Item = &Pack> {
        self.identifiers().into_iter().filter_map(|id| self.get(id))
    }

    /// Every component of every visible pack.
    pub fn components(&self) -> Vec<Component> {
        self.packs()
            .flat_map(|p| p.components().iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.identifiers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty() && self.external.is_empty()
    }
}

impl PackLookup for PackCatalog {
    fn pack_by_id(&self, id: &str) -> Option<&Pack> {
        self.get(id)
    }
}
