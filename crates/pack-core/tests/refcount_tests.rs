//! Integration tests for cross-scope reference counting

use std::fs;

use pack_core::{
    ArtifactRecord, Holder, ProjectIndex, Resource, ResourceReferenceCounter, Scope, ScopeState,
    Verdict,
};
use pack_meta::{Pack, PackCatalog, PackManifest};
use pack_test_utils::{TestHome, catalog_of, package_pack};
use rstest::rstest;

fn catalog() -> PackCatalog {
    catalog_of([
        package_pack("ios", &["xcbeautify"]),
        package_pack("tools", &["xcbeautify", "jq"]),
        package_pack("web", &["node"]),
    ])
}

/// Record `pack` as configured in `scope` with `record`, and index it.
fn configure(home: &TestHome, scope: &Scope, pack: &str, record: ArtifactRecord) {
    let path = scope.state_path(home.config());
    let mut state = ScopeState::load(&path).unwrap();
    state.record_pack(pack);
    state.record_artifacts(pack, record);
    state.save(&path).unwrap();

    let mut index = ProjectIndex::load(&home.config().index_path()).unwrap();
    index.upsert(scope, state.configured_packs.iter().cloned());
    index.save().unwrap();
}

fn packages(names: &[&str]) -> ArtifactRecord {
    ArtifactRecord {
        package_names: names.iter().map(|n| n.to_string()).collect(),
        ..Default::default()
    }
}

fn verdict(
    home: &TestHome,
    catalog: &PackCatalog,
    scope: &Scope,
    pack: &str,
    resource: &Resource,
) -> Verdict {
    ResourceReferenceCounter::new(home.config(), catalog).check(resource, scope, pack)
}

#[test]
fn test_sole_owner_is_safe_to_remove() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(v, Verdict::SafeToRemove);
}

#[test]
fn test_no_index_at_all_is_safe_to_remove() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert!(v.is_safe_to_remove());
}

#[test]
fn test_unrelated_pack_elsewhere_does_not_hold() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let site = home.project_scope("site");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &site, "web", packages(&["node"]));

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(v, Verdict::SafeToRemove);
}

#[test]
fn test_second_pairing_flips_to_still_needed() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let other = home.project_scope("other");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &other, "ios", packages(&["xcbeautify"]));

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(
        v,
        Verdict::StillNeeded(vec![Holder::DeclaredBy {
            scope: other,
            pack: "ios".into(),
        }])
    );
}

#[test]
fn test_catalog_declaration_holds_without_record() {
    // The other scope had xcbeautify before installing, so its record is
    // empty, but its pack still declares the package.
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let other = home.project_scope("other");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &other, "tools", ArtifactRecord::default());

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert!(!v.is_safe_to_remove());
}

#[test]
fn test_other_pack_in_same_scope_holds() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &app, "tools", packages(&["jq"]));

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(
        v,
        Verdict::StillNeeded(vec![Holder::DeclaredBy {
            scope: app,
            pack: "tools".into(),
        }])
    );
}

#[test]
fn test_global_scope_counts_as_another_scope() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &Scope::Global, "ios", packages(&["xcbeautify"]));

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(
        v,
        Verdict::StillNeeded(vec![Holder::DeclaredBy {
            scope: Scope::Global,
            pack: "ios".into(),
        }])
    );
}

#[test]
fn test_unreadable_third_party_state_is_still_needed() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let broken = home.project_scope("broken");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &broken, "web", packages(&["node"]));
    fs::write(broken.state_path(home.config()), "{ not json").unwrap();

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    match v {
        Verdict::StillNeeded(holders) => {
            assert!(matches!(holders.as_slice(), [Holder::UnreadableState { .. }]));
        }
        other => panic!("expected still needed, got {other:?}"),
    }
}

#[test]
fn test_pack_missing_from_catalog_is_still_needed() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let legacy = home.project_scope("legacy");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &legacy, "retired", ArtifactRecord::default());

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(
        v,
        Verdict::StillNeeded(vec![Holder::UnknownPack {
            scope: legacy,
            pack: "retired".into(),
        }])
    );
}

#[test]
fn test_unreadable_index_is_still_needed() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    fs::write(home.config().index_path(), "[1, 2").unwrap();

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert!(matches!(
        v,
        Verdict::StillNeeded(ref h) if matches!(h.as_slice(), [Holder::UnreadableIndex { .. }])
    ));
}

#[test]
fn test_stale_project_is_ignored() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let gone = home.project_scope("gone");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));
    configure(&home, &gone, "ios", packages(&["xcbeautify"]));
    fs::remove_dir_all(home.project("gone")).unwrap();

    let v = verdict(&home, &catalog, &app, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(v, Verdict::SafeToRemove);
}

#[rstest]
#[case("swift-lsp", "swift-lsp@official", false)]
#[case("swift-lsp@official", "swift-lsp", false)]
#[case("swift-lsp@official", "swift-lsp@official", false)]
#[case("swift-lsp@official", "swift-lsp@community", true)]
#[case("swift-lsp", "kotlin-lsp", true)]
fn test_plugin_name_forms(#[case] removing: &str, #[case] held: &str, #[case] safe: bool) {
    let home = TestHome::new();
    let app = home.project_scope("app");
    let other = home.project_scope("other");
    let plugins = |name: &str| ArtifactRecord {
        plugin_names: vec![name.to_string()],
        ..Default::default()
    };
    // The pack declares no components, so only the recorded names count.
    let catalog = catalog_of([Pack::builtin(PackManifest::new("lsp", "LSP", "1.0.0")).unwrap()]);
    configure(&home, &app, "lsp", plugins(removing));
    configure(&home, &other, "lsp", plugins(held));

    let v = verdict(&home, &catalog, &app, "lsp", &Resource::Plugin(removing.into()));
    assert_eq!(v.is_safe_to_remove(), safe);
}

#[test]
fn test_check_all_loads_each_scope_once() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    let other = home.project_scope("other");
    configure(&home, &app, "tools", packages(&["xcbeautify", "jq"]));
    configure(&home, &other, "ios", packages(&["xcbeautify"]));

    let counter = ResourceReferenceCounter::new(home.config(), &catalog);
    let verdicts = counter.check_all(
        &[Resource::Package("xcbeautify".into()), Resource::Package("jq".into())],
        &app,
        "tools",
    );

    assert_eq!(verdicts.len(), 2);
    assert!(!verdicts[0].1.is_safe_to_remove());
    assert!(verdicts[1].1.is_safe_to_remove());
}

#[test]
fn test_trailing_slash_names_the_same_scope() {
    let home = TestHome::new();
    let catalog = catalog();
    let app = home.project_scope("app");
    configure(&home, &app, "ios", packages(&["xcbeautify"]));

    let spelled = Scope::project(format!("{}/", home.project("app").display()));
    assert_eq!(spelled, app);
    let v = verdict(&home, &catalog, &spelled, "ios", &Resource::Package("xcbeautify".into()));
    assert_eq!(v, Verdict::SafeToRemove);
}
