use pack_fs::io;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/dir/test.txt");

    io::write_atomic(&path, b"hello world").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("test.txt");
    fs::write(&path, "original").unwrap();

    io::write_atomic(&path, b"updated").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "updated");
}

#[test]
fn test_write_atomic_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");

    io::write_text(&path, "{}").unwrap();

    let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().flatten().collect();
    assert_eq!(entries.len(), 1, "only the target file should remain");
}

#[test]
fn test_read_optional_missing_is_none() {
    let temp = TempDir::new().unwrap();
    let result = io::read_optional_text(&temp.path().join("absent.txt")).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_read_optional_directory_is_error() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("dir")).unwrap();
    assert!(io::read_optional_text(&temp.path().join("dir")).is_err());
}

#[test]
fn test_remove_if_exists() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("gone.txt");
    fs::write(&path, "x").unwrap();

    assert!(io::remove_if_exists(&path).unwrap());
    assert!(!io::remove_if_exists(&path).unwrap());
}
