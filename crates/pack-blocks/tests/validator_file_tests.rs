//! File-level drift detection and repair.

use pack_blocks::{ExpectedSection, MISSING_VERSION, SectionState, fix_file, validate_file};
use std::fs;
use tempfile::TempDir;

fn expected() -> Vec<ExpectedSection> {
    vec![
        ExpectedSection::new("core", "1.2.0", "core rules"),
        ExpectedSection::new("lint", "1.2.0", "lint rules"),
    ]
}

#[test]
fn test_missing_file_reports_every_section_missing() {
    let temp = TempDir::new().unwrap();
    let result = validate_file(&temp.path().join("AGENTS.local.md"), &expected()).unwrap();

    assert_eq!(result.outdated_identifiers(), vec!["core", "lint"]);
    for status in &result.sections {
        assert_eq!(status.installed_version, MISSING_VERSION);
    }
}

#[test]
fn test_fix_file_creates_then_is_noop() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("AGENTS.local.md");

    let first = fix_file(&path, &expected()).unwrap();
    assert!(first.changed);
    assert!(path.exists());

    let modified = fs::metadata(&path).unwrap().modified().unwrap();
    let second = fix_file(&path, &expected()).unwrap();
    assert!(!second.changed);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);

    let result = validate_file(&path, &expected()).unwrap();
    assert!(result
        .sections
        .iter()
        .all(|s| s.state == SectionState::UpToDate));
}

#[test]
fn test_fix_file_preserves_user_edits_outside_sections() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("AGENTS.local.md");
    fs::write(
        &path,
        "My header\n\n<!-- pack:begin core v1.0.0 -->\nstale\n<!-- pack:end core -->\n\nMy footer\n",
    )
    .unwrap();

    let result = fix_file(&path, &expected()).unwrap();
    assert_eq!(result.repaired, vec!["core".to_string(), "lint".to_string()]);

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("My header\n\n<!-- pack:begin core v1.2.0 -->\ncore rules\n"));
    assert!(written.contains("\nMy footer\n"));
    assert!(written.ends_with("<!-- pack:end lint -->\n"));
}
