//! Multi-scope lifecycle: converge in several scopes, remove one at a time.

use std::collections::BTreeMap;
use std::fs;

use pack_core::{EngineConfig, Error, Holder, ProjectIndex, Resource, Scope, SyncEngine};
use pack_meta::PackCatalog;
use pack_test_utils::{RecordingInstaller, TestHome, catalog_of, init_tracing, package_pack};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn catalog() -> PackCatalog {
    catalog_of([
        package_pack("ios", &["xcbeautify", "swiftlint"]),
        package_pack("web", &["node"]),
    ])
}

fn install(home: &TestHome, catalog: &PackCatalog, scope: &Scope, ids: &[&str]) {
    let selection: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    SyncEngine::new(home.config(), catalog, scope.clone())
        .converge(
            &selection,
            &mut RecordingInstaller::new(),
            &BTreeMap::from([("PROJECT_NAME".to_string(), "Demo".to_string())]),
        )
        .unwrap();
}

fn uninstall(home: &TestHome, catalog: &PackCatalog, scope: &Scope, pack: &str) -> Vec<Resource> {
    SyncEngine::new(home.config(), catalog, scope.clone())
        .remove_pack(pack)
        .unwrap()
        .to_uninstall()
        .to_vec()
}

#[test]
fn test_shared_package_released_by_last_scope() {
    init_tracing();
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let other = home.project_scope("other");

    install(&home, &catalog, &app, &["ios.xcbeautify", "ios.swiftlint"]);
    install(&home, &catalog, &other, &["ios.xcbeautify"]);
    install(&home, &catalog, &Scope::Global, &["web.node"]);

    // Pack ios still declares swiftlint, so `other` holds both packages
    assert!(uninstall(&home, &catalog, &app, "ios").is_empty());

    assert_eq!(
        uninstall(&home, &catalog, &other, "ios"),
        vec![Resource::Package("xcbeautify".into())]
    );

    let index = ProjectIndex::load(&home.config().index_path()).unwrap();
    assert!(index.scopes_using("ios").is_empty());
    assert_eq!(index.scopes_using("web"), vec![Scope::Global]);
}

#[test]
fn test_unreadable_third_party_blocks_release() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let broken = home.project_scope("broken");
    install(&home, &catalog, &app, &["ios.xcbeautify"]);
    install(&home, &catalog, &broken, &["web.node"]);
    fs::write(broken.state_path(home.config()), "]]]").unwrap();

    let report = SyncEngine::new(home.config(), &catalog, app.clone())
        .remove_pack("ios")
        .unwrap();

    assert!(report.to_uninstall().is_empty());
    let (resource, holders) = &report.plan.retain[0];
    assert_eq!(resource, &Resource::Package("xcbeautify".into()));
    assert!(matches!(holders.as_slice(), [Holder::UnreadableState { scope, .. }] if scope == &broken));
}

#[test]
fn test_deleted_project_is_pruned_and_ignored() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let gone = home.project_scope("gone");
    install(&home, &catalog, &app, &["ios.xcbeautify"]);
    install(&home, &catalog, &gone, &["ios.xcbeautify"]);
    fs::remove_dir_all(home.project("gone")).unwrap();

    assert_eq!(
        uninstall(&home, &catalog, &app, "ios"),
        vec![Resource::Package("xcbeautify".into())]
    );

    let mut index = ProjectIndex::load(&home.config().index_path()).unwrap();
    assert_eq!(index.prune_stale(), vec![gone.index_key()]);
    index.save().unwrap();
    assert!(ProjectIndex::load(&home.config().index_path()).unwrap().is_empty());
}

#[test]
fn test_malformed_target_state_aborts_without_writing() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    install(&home, &catalog, &app, &["ios.xcbeautify"]);
    let before = home.generated(&app);
    fs::write(app.state_path(home.config()), "{\"toolVersion\":").unwrap();

    let err = SyncEngine::new(home.config(), &catalog, app.clone())
        .converge(
            &["web.node".to_string()],
            &mut RecordingInstaller::new(),
            &BTreeMap::new(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::MalformedState { .. }));
    assert_eq!(home.generated(&app), before);
}

#[rstest]
#[case::default_name(None, "AGENTS.local.md")]
#[case::overridden(Some("CLAUDE.md"), "CLAUDE.md")]
fn test_generated_file_name_follows_config(#[case] name: Option<&str>, #[case] expected: &str) {
    let home = TestHome::new();
    if let Some(name) = name {
        fs::write(
            home.config().config_path(),
            format!("generated_file_name = \"{name}\"\n"),
        )
        .unwrap();
    }
    let config = EngineConfig::with_home(home.config().home()).unwrap();
    let catalog = catalog();
    let app = home.project_scope("app");

    SyncEngine::new(&config, &catalog, app.clone())
        .converge(
            &["web.node".to_string()],
            &mut RecordingInstaller::new(),
            &BTreeMap::new(),
        )
        .unwrap();

    home.assert_file_exists(&home.project("app").join(expected));
}

#[test]
fn test_global_scope_writes_under_home() {
    let home = TestHome::new();
    let catalog = catalog();
    install(&home, &catalog, &Scope::Global, &["web.node"]);

    let generated = Scope::Global.generated_file(home.config());
    assert_eq!(generated, home.config().home().join("AGENTS.md"));
    home.assert_file_exists(&generated);
    home.assert_file_exists(&home.config().global_state_path());
}
