//! Pack builders and a fake installer.

use std::collections::BTreeSet;
use std::fs;

use pack_core::{ArtifactRecord, ComponentInstaller, Error, InstallContext, ServiceEntryRef};
use pack_meta::{Component, InstallAction, Pack, PackCatalog, PackManifest, TemplateSource};

/// A built-in pack with one `Package` component per name, ids
/// `<pack>.<package>`, plus one inline template section named after the pack.
pub fn package_pack(id: &str, packages: &[&str]) -> Pack {
    let mut manifest = PackManifest::new(id, id, "1.0.0");
    manifest.components = packages
        .iter()
        .map(|name| {
            Component::in_pack(
                id,
                name,
                InstallAction::Package {
                    name: name.to_string(),
                },
            )
        })
        .collect();
    manifest.templates = vec![TemplateSource::inline(
        id,
        format!("## {id}\n\nProject: __PROJECT_NAME__"),
    )];
    Pack::builtin(manifest).unwrap()
}

/// A catalog holding `packs` as built-ins.
pub fn catalog_of(packs: impl IntoIterator<Item = Pack>) -> PackCatalog {
    let mut catalog = PackCatalog::new();
    for pack in packs {
        catalog.register_builtin(pack).unwrap();
    }
    catalog
}

/// Installer that performs no real side effects apart from writing copied
/// files, and records every call.
///
/// Names in `preexisting` behave as if the user had installed them before,
/// so they are left out of the returned record.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    pub calls: Vec<String>,
    pub preexisting: BTreeSet<String>,
    /// Component id whose install fails.
    pub fail_on: Option<String>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preexisting(mut self, name: &str) -> Self {
        self.preexisting.insert(name.to_string());
        self
    }

    pub fn failing_on(mut self, component_id: &str) -> Self {
        self.fail_on = Some(component_id.to_string());
        self
    }

    fn created(&self, name: &str) -> bool {
        !self.preexisting.contains(name)
    }
}

impl ComponentInstaller for RecordingInstaller {
    fn install(
        &mut self,
        component: &Component,
        ctx: &InstallContext<'_>,
    ) -> pack_core::Result<ArtifactRecord> {
        self.calls.push(component.id.clone());
        if self.fail_on.as_deref() == Some(component.id.as_str()) {
            return Err(Error::InstallFailed {
                component: component.id.clone(),
                message: "simulated failure".into(),
            });
        }

        let mut record = ArtifactRecord::default();
        match &component.install_action {
            InstallAction::Package { name } if self.created(name) => {
                record.package_names.push(name.clone());
            }
            InstallAction::Plugin { name } if self.created(name) => {
                record.plugin_names.push(name.clone());
            }
            InstallAction::ServiceEntry(entry) if self.created(&entry.name) => {
                record.service_entries.push(ServiceEntryRef {
                    name: entry.name.clone(),
                    scope: entry.scope,
                });
            }
            InstallAction::CopyFile { destination, .. } => {
                let target = ctx.scope_root.join(destination);
                fs::create_dir_all(target.parent().unwrap()).unwrap();
                fs::write(&target, format!("installed by {}\n", component.id)).unwrap();
                record.files.push(destination.clone());
            }
            InstallAction::SettingsMerge { settings } => {
                if let Some(map) = settings.as_object() {
                    record.settings_key_paths.extend(map.keys().cloned());
                }
            }
            _ => {}
        }
        Ok(record)
    }
}
