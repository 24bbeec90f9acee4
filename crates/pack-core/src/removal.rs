//! Planning the removal of a pack from one scope

use pack_meta::PackLookup;

use crate::config::EngineConfig;
use crate::refcount::{Holder, Resource, ResourceReferenceCounter, Verdict};
use crate::scope::Scope;
use crate::state::ScopeState;
use crate::{Error, Result};

/// What removing a pack from a scope would do.
///
/// Scope-local artifacts belong to this installation alone and are always
/// removable. Shared resources are split by the reference counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalPlan {
    pub scope: Scope,
    pub pack: String,
    pub files: Vec<String>,
    pub template_sections: Vec<String>,
    pub shell_hook_commands: Vec<String>,
    pub settings_key_paths: Vec<String>,
    /// Shared resources nothing else references.
    pub remove: Vec<Resource>,
    /// Shared resources still referenced, with the reasons.
    pub retain: Vec<(Resource, Vec<Holder>)>,
}

pub struct RemovalPlanner<'a, L: PackLookup + ?Sized> {
    config: &'a EngineConfig,
    counter: ResourceReferenceCounter<'a, L>,
}

impl<'a, L: PackLookup + ?Sized> RemovalPlanner<'a, L> {
    pub fn new(config: &'a EngineConfig, catalog: &'a L) -> Self {
        Self {
            config,
            counter: ResourceReferenceCounter::new(config, catalog),
        }
    }

    /// Plan removing `pack_id` from `scope`, reading the scope's state.
    ///
    /// # Errors
    ///
    /// [`Error::PackNotConfigured`] when the pack is not configured there,
    /// plus any state loading error.
    pub fn plan(&self, scope: &Scope, pack_id: &str) -> Result<RemovalPlan> {
        let state = ScopeState::load(&scope.state_path(self.config))?;
        self.plan_with_state(scope, pack_id, &state)
    }

    pub(crate) fn plan_with_state(
        &self,
        scope: &Scope,
        pack_id: &str,
        state: &ScopeState,
    ) -> Result<RemovalPlan> {
        if !state.is_configured(pack_id) {
            return Err(Error::PackNotConfigured {
                pack: pack_id.to_string(),
                scope: scope.to_string(),
            });
        }
        let record = state.artifacts(pack_id).cloned().unwrap_or_default();

        let mut remove = Vec::new();
        let mut retain = Vec::new();
        for (resource, verdict) in self.counter.check_all(&record.resources(), scope, pack_id) {
            match verdict {
                Verdict::SafeToRemove => remove.push(resource),
                Verdict::StillNeeded(holders) => {
                    tracing::info!(%resource, holders = holders.len(), "retaining shared resource");
                    retain.push((resource, holders));
                }
            }
        }

        Ok(RemovalPlan {
            scope: scope.clone(),
            pack: pack_id.to_string(),
            files: record.files,
            template_sections: record.template_sections,
            shell_hook_commands: record.shell_hook_commands,
            settings_key_paths: record.settings_key_paths,
            remove,
            retain,
        })
    }
}
