//! Loading external packs behind the sandbox boundary.
//!
//! Every path an external manifest declares is resolved against the pack
//! root before use. An artifact whose path escapes is dropped and recorded
//! as a [`RejectedArtifact`]; the rest of the pack still loads. Components
//! that depend on a dropped component are dropped with it.

use std::collections::BTreeSet;
use std::path::Path;

use pack_fs::io::read_text;
use pack_fs::resolve_contained;
use pack_meta::{Pack, PackManifest, PackSource, TemplateContribution};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Template,
    Component,
    HookFragment,
    ConfigureProject,
}

/// An artifact left out of a loaded pack, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedArtifact {
    pub kind: ArtifactKind,
    /// Section id, component id, hook event or script path.
    pub name: String,
    /// The offending declared path, if the artifact had one.
    pub path: Option<String>,
    pub reason: String,
}

/// Result of [`load_external_pack`].
#[derive(Debug, Clone)]
pub struct LoadedPack {
    pub pack: Pack,
    pub rejected: Vec<RejectedArtifact>,
}

/// Load an external pack rooted at `root`.
///
/// # Errors
///
/// - [`Error::Meta`] when the manifest itself is invalid
/// - [`Error::EntirePackEscapes`] when the manifest declared content but
///   nothing survived the sandbox check
/// - [`Error::Fs`] when `root` cannot be resolved
pub fn load_external_pack(manifest: PackManifest, root: &Path) -> Result<LoadedPack> {
    manifest.validate()?;
    let root = resolve_contained(root, ".")?;
    let mut rejected = Vec::new();
    let mut manifest = manifest;

    let templates = load_templates(&manifest, &root, &mut rejected);

    let dropped = drop_escaping_components(&mut manifest, &root, &mut rejected);
    if !dropped.is_empty() {
        drop_dependents(&mut manifest, dropped, &mut rejected);
    }

    manifest.hook_fragments.retain(|fragment| {
        match check(&root, &fragment.file) {
            Ok(()) => true,
            Err(reason) => {
                rejected.push(RejectedArtifact {
                    kind: ArtifactKind::HookFragment,
                    name: fragment.event.clone(),
                    path: Some(fragment.file.clone()),
                    reason,
                });
                false
            }
        }
    });

    if let Some(configure) = &manifest.configure_project
        && let Err(reason) = check(&root, &configure.script)
    {
        rejected.push(RejectedArtifact {
            kind: ArtifactKind::ConfigureProject,
            name: configure.script.clone(),
            path: Some(configure.script.clone()),
            reason,
        });
        manifest.configure_project = None;
    }

    // Templates were resolved into contributions; keep the manifest view in
    // step so re-analysis sees only what survived.
    let kept: BTreeSet<&str> = templates.iter().map(|t| t.section_id.as_str()).collect();
    manifest.templates.retain(|t| kept.contains(t.section_id.as_str()));

    for r in &rejected {
        tracing::warn!(
            pack = %manifest.identifier,
            kind = ?r.kind,
            artifact = %r.name,
            reason = %r.reason,
            "dropped pack artifact"
        );
    }

    if !rejected.is_empty() && templates.is_empty() && !manifest.declares_content() {
        return Err(Error::EntirePackEscapes {
            pack: manifest.identifier.clone(),
        });
    }

    tracing::info!(
        pack = %manifest.identifier,
        root = %root.display(),
        rejected = rejected.len(),
        "loaded external pack"
    );

    Ok(LoadedPack {
        pack: Pack::from_parts(manifest, templates, PackSource::External { root }),
        rejected,
    })
}

fn load_templates(
    manifest: &PackManifest,
    root: &Path,
    rejected: &mut Vec<RejectedArtifact>,
) -> Vec<TemplateContribution> {
    let mut templates = Vec::new();
    for source in &manifest.templates {
        let text = match (&source.content, &source.content_file) {
            (Some(inline), _) => Ok(inline.clone()),
            (None, Some(file)) => resolve_contained(root, file)
                .and_then(|path| read_text(&path))
                .map_err(|e| Error::from_sandbox(e).to_string()),
            (None, None) => Err("template declares neither content nor a file".to_string()),
        };
        match text {
            Ok(template) => templates.push(TemplateContribution {
                section_id: source.section_id.clone(),
                template,
                placeholders: source.placeholders.clone(),
            }),
            Err(reason) => rejected.push(RejectedArtifact {
                kind: ArtifactKind::Template,
                name: source.section_id.clone(),
                path: source.content_file.clone(),
                reason,
            }),
        }
    }
    templates
}

fn drop_escaping_components(
    manifest: &mut PackManifest,
    root: &Path,
    rejected: &mut Vec<RejectedArtifact>,
) -> BTreeSet<String> {
    let mut dropped = BTreeSet::new();
    manifest.components.retain(|component| {
        let Some(source) = component.install_action.source_file() else {
            return true;
        };
        match check(root, source) {
            Ok(()) => true,
            Err(reason) => {
                rejected.push(RejectedArtifact {
                    kind: ArtifactKind::Component,
                    name: component.id.clone(),
                    path: Some(source.to_string()),
                    reason,
                });
                dropped.insert(component.id.clone());
                false
            }
        }
    });
    dropped
}

/// Remove components that (transitively) depend on one already dropped.
fn drop_dependents(
    manifest: &mut PackManifest,
    mut dropped: BTreeSet<String>,
    rejected: &mut Vec<RejectedArtifact>,
) {
    loop {
        let newly: Vec<String> = manifest
            .components
            .iter()
            .filter(|c| c.dependencies.iter().any(|d| dropped.contains(d)))
            .map(|c| c.id.clone())
            .collect();
        if newly.is_empty() {
            break;
        }
        manifest.components.retain(|c| !newly.contains(&c.id));
        for id in newly {
            rejected.push(RejectedArtifact {
                kind: ArtifactKind::Component,
                name: id.clone(),
                path: None,
                reason: "depends on a rejected component".to_string(),
            });
            dropped.insert(id);
        }
    }
}

fn check(root: &Path, relative: &str) -> std::result::Result<(), String> {
    resolve_contained(root, relative)
        .map(|_| ())
        .map_err(|e| Error::from_sandbox(e).to_string())
}
