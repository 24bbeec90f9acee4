//! Convergence of one scope toward the selected packs

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use pack_blocks::{
    CORE_SECTION_ID, Document, ExpectedSection, MISSING_VERSION, SectionState, fix_file,
    remove_section, render, replace_section, validate_file,
};
use pack_fs::io::{read_optional_text, remove_if_exists, write_text};
use pack_meta::{Pack, PackCatalog, PackSource, resolve};
use pack_trust::ScriptRunner;

use crate::config::{EngineConfig, TOOL_VERSION};
use crate::index::ProjectIndex;
use crate::lock::EngineLock;
use crate::manifest::{FileStatus, Manifest};
use crate::removal::RemovalPlanner;
use crate::scope::Scope;
use crate::state::{ArtifactRecord, ScopeState};
use crate::{Error, Result};

use super::checks::evaluate_check;
use super::installer::{ComponentInstaller, InstallContext};
use super::report::{
    ConvergeReport, Diagnosis, DoctorReport, DoctorStatus, RemovalReport, RepairOutcome,
    RepairReport,
};

/// Core section content written when no other template is configured.
pub const DEFAULT_CORE_TEMPLATE: &str = "\
# Agent instructions

This file is generated. Text between pack markers is rewritten on every
sync; anything outside them is yours and is kept as is.
";

/// Drives converge, diagnose, repair and removal for one scope.
///
/// Every operation that writes takes the engine lock first. State,
/// manifest and index are saved once the work succeeded, or, for a failed
/// converge, with whatever was installed before the failure.
pub struct SyncEngine<'a> {
    config: &'a EngineConfig,
    catalog: &'a PackCatalog,
    scope: Scope,
    core_template: String,
}

impl<'a> SyncEngine<'a> {
    pub fn new(config: &'a EngineConfig, catalog: &'a PackCatalog, scope: Scope) -> Self {
        Self {
            config,
            catalog,
            scope,
            core_template: DEFAULT_CORE_TEMPLATE.to_string(),
        }
    }

    pub fn with_core_template(mut self, template: impl Into<String>) -> Self {
        self.core_template = template.into();
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Install the selected components and their dependencies, then bring
    /// the generated file in line with every configured pack.
    ///
    /// `values` are merged over the placeholder values already stored for
    /// the scope. An installer error aborts the run; components installed
    /// before it are still recorded in state and manifest so their
    /// artifacts stay owned, but the generated file is not touched.
    pub fn converge(
        &self,
        selection: &[String],
        installer: &mut dyn ComponentInstaller,
        values: &BTreeMap<String, String>,
    ) -> Result<ConvergeReport> {
        let _lock = EngineLock::acquire(&self.config.lock_path())?;
        let plan = resolve(selection, &self.catalog.components())?;
        let owners = self.owners_of(plan.ids().into_iter())?;

        let root = self.scope.root(self.config);
        let state_path = self.scope.state_path(self.config);
        let manifest_path = self.scope.manifest_path(self.config);
        let mut state = ScopeState::load(&state_path)?;
        let mut manifest = Manifest::load(&manifest_path)?;

        let mut merged_values = state.resolved_values.clone();
        merged_values.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut report = ConvergeReport {
            added_dependencies: plan.added_dependencies.clone(),
            ..Default::default()
        };

        for component in &plan.ordered {
            let pack = owners[component.id.as_str()];
            let ctx = InstallContext {
                scope: &self.scope,
                scope_root: root,
                pack,
                values: &merged_values,
            };
            tracing::info!(component = %component.id, action = component.install_action.kind(), "installing component");
            let record = match installer.install(component, &ctx) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(component = %component.id, error = %e, "install failed");
                    if !report.installed.is_empty() {
                        self.save_partial(&state, &state_path, &manifest, &manifest_path)?;
                    }
                    return Err(e);
                }
            };

            for file in &record.files {
                let absolute = root.join(file);
                if absolute.is_file() {
                    manifest.record_file(file, &absolute)?;
                    report.files_recorded.push(file.clone());
                } else {
                    tracing::warn!(file = %file, "installer reported a file that does not exist");
                }
            }
            state.record_pack(pack.identifier());
            state.record_artifacts(pack.identifier(), record);
            report.installed.push(component.id.clone());
        }

        let source_directory = owners.values().find_map(|p| match &p.source {
            PackSource::External { root } => Some(root.to_string_lossy().into_owned()),
            PackSource::BuiltIn => None,
        });
        let touched_packs: BTreeSet<&str> = owners.values().map(|p| p.identifier()).collect();
        manifest.begin_run(source_directory.as_deref(), touched_packs, plan.ids());
        state.set_resolved_values(values);

        self.compose_into(&mut state, &mut report)?;

        state.touch();
        state.save(&state_path)?;
        manifest.save(&manifest_path)?;
        self.update_index(&state)?;

        tracing::info!(
            scope = %self.scope,
            components = report.installed.len(),
            sections = report.sections_written.len(),
            "converged"
        );
        Ok(report)
    }

    /// Read-only health report for the scope.
    ///
    /// Never takes the lock and never writes. A state, manifest or
    /// generated file that exists but cannot be parsed is an error.
    pub fn diagnose(&self, runner: &dyn ScriptRunner) -> Result<DoctorReport> {
        let state = ScopeState::load(&self.scope.state_path(self.config))?;
        let mut report = DoctorReport::default();

        if state.configured_packs.is_empty() && state.last_synced.is_none() {
            report.items.push(Diagnosis::new(
                self.scope.to_string(),
                DoctorStatus::NotApplicable,
                "never synced",
            ));
            return Ok(report);
        }

        for pack_id in &state.configured_packs {
            if self.catalog.get(pack_id).is_none() {
                report.items.push(Diagnosis::new(
                    format!("pack {}", pack_id),
                    DoctorStatus::NeedsAttention,
                    "configured here but no longer in the catalog",
                ));
            }
        }

        let expected = self.expected_sections(&state);
        let generated = self.scope.generated_file(self.config);
        let validation = validate_file(&generated, &expected)?;
        for status in &validation.sections {
            let subject = format!("section {}", status.identifier);
            let diagnosis = match status.state {
                SectionState::UpToDate => Diagnosis::new(subject, DoctorStatus::UpToDate, "matches"),
                SectionState::Outdated if status.malformed => Diagnosis::new(
                    subject,
                    DoctorStatus::NeedsAttention,
                    "markers are unpaired or repeated; fix them by hand",
                ),
                SectionState::Outdated if status.installed_version == MISSING_VERSION => {
                    Diagnosis::new(subject, DoctorStatus::Outdated, "missing from the generated file")
                }
                SectionState::Outdated => Diagnosis::new(
                    subject,
                    DoctorStatus::Outdated,
                    format!(
                        "content differs from v{}",
                        status.expected_version.as_deref().unwrap_or(TOOL_VERSION)
                    ),
                ),
                SectionState::Unmanaged => Diagnosis::new(
                    subject,
                    DoctorStatus::NotApplicable,
                    "not managed by any configured pack",
                ),
            };
            report.items.push(diagnosis);
        }

        let root = self.scope.root(self.config);
        let manifest = Manifest::load(&self.scope.manifest_path(self.config))?;
        for (path, status) in manifest.drifted_files(root)? {
            let subject = format!("file {}", path);
            report.items.push(match status {
                FileStatus::Modified => Diagnosis::new(
                    subject,
                    DoctorStatus::NeedsAttention,
                    "edited since it was installed",
                ),
                _ => Diagnosis::new(subject, DoctorStatus::Outdated, "missing; sync to reinstall"),
            });
        }

        for pack in self.configured_packs(&state) {
            for check in &pack.manifest.checks {
                report.items.push(evaluate_check(
                    pack.identifier(),
                    check,
                    &self.scope,
                    runner,
                    root,
                    self.config.script_timeout(),
                ));
            }
        }

        tracing::debug!(scope = %self.scope, items = report.items.len(), overall = ?report.overall(), "diagnosed");
        Ok(report)
    }

    /// Re-render drifted sections of the generated file.
    ///
    /// Sections with malformed markers and hand-edited copied files are
    /// reported as not repairable and left alone.
    pub fn repair(&self) -> Result<RepairReport> {
        let _lock = EngineLock::acquire(&self.config.lock_path())?;
        let state = ScopeState::load(&self.scope.state_path(self.config))?;
        let expected = self.expected_sections(&state);
        let generated = self.scope.generated_file(self.config);
        let mut report = RepairReport::default();

        let before = validate_file(&generated, &expected)?;
        match fix_file(&generated, &expected) {
            Ok(fixed) => {
                for id in &fixed.repaired {
                    report.push(format!("section {}", id), RepairOutcome::Repaired, "re-rendered");
                }
                for id in &fixed.skipped {
                    report.push(
                        format!("section {}", id),
                        RepairOutcome::NotRepairable,
                        "markers are unpaired or repeated",
                    );
                }
                report.changed = fixed.changed;
            }
            Err(e) => {
                tracing::error!(path = %generated.display(), error = %e, "repair failed");
                for id in before.outdated_identifiers() {
                    report.push(format!("section {}", id), RepairOutcome::Failed, e.to_string());
                }
            }
        }

        let manifest = Manifest::load(&self.scope.manifest_path(self.config))?;
        for (path, status) in manifest.drifted_files(self.scope.root(self.config))? {
            let reason = match status {
                FileStatus::Modified => "edited since it was installed; keep or reinstall by hand",
                _ => "missing; sync to reinstall",
            };
            report.push(format!("file {}", path), RepairOutcome::NotRepairable, reason);
        }

        Ok(report)
    }

    /// Remove `pack_id` from this scope.
    ///
    /// The pack's recorded sections are dropped from the generated file and
    /// its copied files are deleted when unchanged since install. Shared
    /// resources are only reported; uninstalling them is up to the caller.
    pub fn remove_pack(&self, pack_id: &str) -> Result<RemovalReport> {
        let _lock = EngineLock::acquire(&self.config.lock_path())?;
        let state_path = self.scope.state_path(self.config);
        let manifest_path = self.scope.manifest_path(self.config);
        let mut state = ScopeState::load(&state_path)?;
        let mut manifest = Manifest::load(&manifest_path)?;

        let plan = RemovalPlanner::new(self.config, self.catalog).plan_with_state(
            &self.scope,
            pack_id,
            &state,
        )?;

        let generated = self.scope.generated_file(self.config);
        let mut sections_removed = Vec::new();
        if let Some(original) = read_optional_text(&generated)? {
            let mut text = original.clone();
            for id in &plan.template_sections {
                let next = remove_section(&text, id);
                if next != text {
                    sections_removed.push(id.clone());
                    text = next;
                }
            }
            if text != original {
                write_text(&generated, &text)?;
            }
        }

        let root = self.scope.root(self.config);
        let mut files_deleted = Vec::new();
        let mut files_kept = Vec::new();
        for file in &plan.files {
            match manifest.check_file(file, root)? {
                FileStatus::Unchanged => {
                    if remove_if_exists(&root.join(file))? {
                        files_deleted.push(file.clone());
                    }
                }
                FileStatus::Missing => {}
                FileStatus::Modified | FileStatus::Untracked => {
                    tracing::info!(file = %file, "keeping file not verifiably unchanged");
                    files_kept.push(file.clone());
                }
            }
            manifest.forget(file);
        }
        manifest.forget_pack(pack_id);

        state.remove_pack(pack_id);
        state.save(&state_path)?;
        manifest.save(&manifest_path)?;
        self.update_index(&state)?;

        tracing::info!(
            pack = %pack_id,
            scope = %self.scope,
            retained = plan.retain.len(),
            "removed pack"
        );
        Ok(RemovalReport {
            plan,
            sections_removed,
            files_deleted,
            files_kept,
        })
    }

    /// The sections the generated file should hold for `state`: core first,
    /// then each configured pack's templates in pack id order.
    pub fn expected_sections(&self, state: &ScopeState) -> Vec<ExpectedSection> {
        let values = &state.resolved_values;
        std::iter::once(ExpectedSection::new(
            CORE_SECTION_ID,
            TOOL_VERSION,
            render(&self.core_template, values),
        ))
        .chain(self.configured_packs(state).flat_map(|pack| {
            pack.templates.iter().map(move |t| {
                ExpectedSection::new(&t.section_id, pack.version(), render(&t.template, values))
            })
        }))
        .collect()
    }

    fn configured_packs<'s>(&'s self, state: &'s ScopeState) -> impl Iterator<Item = &'a Pack> + 's {
        state
            .configured_packs
            .iter()
            .filter_map(|id| self.catalog.get(id))
    }

    /// Map each component id to the pack that declares it.
    fn owners_of<'c>(
        &self,
        ids: impl Iterator<Item = &'c str>,
    ) -> Result<BTreeMap<&'c str, &'a Pack>> {
        let mut owners = BTreeMap::new();
        for id in ids {
            let pack = self
                .catalog
                .packs()
                .find(|p| p.components().iter().any(|c| c.id == id))
                .ok_or_else(|| Error::PackNotFound { id: id.to_string() })?;
            owners.insert(id, pack);
        }
        Ok(owners)
    }

    /// Write every expected section into the generated file, leaving user
    /// text and sections with malformed markers untouched.
    fn compose_into(&self, state: &mut ScopeState, report: &mut ConvergeReport) -> Result<()> {
        let generated = self.scope.generated_file(self.config);
        let original = read_optional_text(&generated)?.unwrap_or_default();
        let mut text = original.clone();

        for pack in self.configured_packs(state).collect::<Vec<_>>() {
            let mut owned = ArtifactRecord::default();
            let previously = state.artifacts(pack.identifier());
            for t in &pack.templates {
                let doc = Document::parse(&text);
                let recorded = previously.is_some_and(|r| r.template_sections.contains(&t.section_id));
                if !doc.mentions(&t.section_id) || recorded {
                    owned.template_sections.push(t.section_id.clone());
                }
            }
            if !owned.is_empty() {
                state.record_artifacts(pack.identifier(), owned);
            }
        }

        for section in self.expected_sections(state) {
            if !Document::parse(&text).is_editable(&section.identifier) {
                report.sections_skipped.push(section.identifier);
                continue;
            }
            text = replace_section(&text, &section.identifier, &section.content, &section.version);
            report.sections_written.push(section.identifier);
        }

        if text != original {
            write_text(&generated, &text)?;
            report.file_changed = true;
        }
        Ok(())
    }

    /// Persist what a failed run already installed. State and manifest only
    /// ever gain entries here, so a retry sees these artifacts as owned.
    fn save_partial(
        &self,
        state: &ScopeState,
        state_path: &Path,
        manifest: &Manifest,
        manifest_path: &Path,
    ) -> Result<()> {
        tracing::warn!(scope = %self.scope, "recording partially installed components");
        state.save(state_path)?;
        manifest.save(manifest_path)?;
        self.update_index(state)
    }

    fn update_index(&self, state: &ScopeState) -> Result<()> {
        let mut index = ProjectIndex::load(&self.config.index_path())?;
        index.upsert(&self.scope, state.configured_packs.iter().cloned());
        index.save()
    }
}
