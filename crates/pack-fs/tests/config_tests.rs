use pack_fs::{ConfigStore, Error};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Record {
    name: String,
    count: u32,
}

fn sample() -> Record {
    Record {
        name: "pack".to_string(),
        count: 3,
    }
}

#[rstest::rstest]
#[case("record.json")]
#[case("record.toml")]
fn test_save_then_load(#[case] file: &str) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(file);
    let store = ConfigStore::new();

    store.save(&path, &sample()).unwrap();
    let loaded: Record = store.load(&path).unwrap();

    assert_eq!(loaded, sample());
}

#[test]
fn test_load_optional_missing_is_none() {
    let temp = TempDir::new().unwrap();
    let loaded: Option<Record> = ConfigStore::new()
        .load_optional(&temp.path().join("missing.json"))
        .unwrap();
    assert!(loaded.is_none());
}

#[test]
fn test_load_optional_malformed_is_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let result: pack_fs::Result<Option<Record>> = ConfigStore::new().load_optional(&path);
    assert!(matches!(result, Err(Error::ConfigParse { .. })));
}

#[test]
fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let result = ConfigStore::new().save(&temp.path().join("record.ini"), &sample());
    assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
}
