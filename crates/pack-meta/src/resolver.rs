//! Dependency ordering for selected components.
//!
//! Given the ids a user selected and the full component catalog, produce an
//! installation order in which every component's transitive dependencies
//! come first and each component appears once, however many paths reach it.
//!
//! # Example
//!
//! ```
//! use pack_meta::{Component, InstallAction, resolve};
//!
//! let pkg = |name: &str| InstallAction::Package { name: name.into() };
//! let catalog = vec![
//!     Component::new("a", pkg("a")).with_dependencies(["b"]),
//!     Component::new("b", pkg("b")),
//! ];
//!
//! let plan = resolve(&["a".to_string()], &catalog).unwrap();
//! assert_eq!(plan.ids(), vec!["b", "a"]);
//! assert_eq!(plan.added_dependencies, vec!["b".to_string()]);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Error, Result};
use crate::schema::Component;

/// Installation-ordered result of [`resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// Dependencies before dependents; each id exactly once.
    pub ordered: Vec<Component>,
    /// Ids pulled in transitively that were not selected, in plan order.
    pub added_dependencies: Vec<String>,
}

impl Plan {
    pub fn ids(&self) -> Vec<&str> {
        self.ordered.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Order `selected` and everything it depends on.
///
/// # Errors
///
/// - [`Error::DependencyCycle`] naming the first id found to be its own
///   ancestor (a self-dependency included)
/// - [`Error::UnknownComponent`] for a selected or required id missing from
///   `catalog`
/// - [`Error::DuplicateComponent`] if `catalog` lists an id twice
pub fn resolve(selected: &[String], catalog: &[Component]) -> Result<Plan> {
    let mut by_id: HashMap<&str, &Component> = HashMap::with_capacity(catalog.len());
    for component in catalog {
        if let Some(first) = by_id.insert(component.id.as_str(), component) {
            return Err(Error::DuplicateComponent {
                id: component.id.clone(),
                first: first.pack_identifier.clone().unwrap_or_default(),
                second: component.pack_identifier.clone().unwrap_or_default(),
            });
        }
    }
    let selected_set: BTreeSet<&str> = selected.iter().map(String::as_str).collect();

    let mut walk = Walk {
        by_id: &by_id,
        visiting: HashSet::new(),
        emitted: HashSet::new(),
        ordered: Vec::new(),
    };

    for id in selected {
        walk.visit(id, None)?;
    }

    let added_dependencies = walk
        .ordered
        .iter()
        .filter(|c| !selected_set.contains(c.id.as_str()))
        .map(|c| c.id.clone())
        .collect::<Vec<_>>();

    if !added_dependencies.is_empty() {
        tracing::debug!(added = ?added_dependencies, "resolver pulled in dependencies");
    }

    Ok(Plan {
        ordered: walk.ordered,
        added_dependencies,
    })
}

struct Walk<'a> {
    by_id: &'a HashMap<&'a str, &'a Component>,
    visiting: HashSet<String>,
    emitted: HashSet<String>,
    ordered: Vec<Component>,
}

impl Walk<'_> {
    fn visit(&mut self, id: &str, required_by: Option<&str>) -> Result<()> {
        if self.emitted.contains(id) {
            return Ok(());
        }
        if self.visiting.contains(id) {
            return Err(Error::DependencyCycle { id: id.to_string() });
        }
        let component = *self.by_id.get(id).ok_or_else(|| Error::UnknownComponent {
            id: id.to_string(),
            required_by: required_by.map(str::to_string),
        })?;

        self.visiting.insert(id.to_string());
        for dep in &component.dependencies {
            self.visit(dep, Some(id))?;
        }
        self.visiting.remove(id);

        self.emitted.insert(id.to_string());
        self.ordered.push(component.clone());
        Ok(())
    }
}
