//! Format-agnostic record loading and saving

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result, io};

/// Format-agnostic store for persisted records.
///
/// Format is detected from the file extension (`.json` or `.toml`).
/// Writes are atomic.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a record, failing if the file is missing or malformed.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = io::read_text(path)?;
        Self::parse(path, &content)
    }

    /// Load a record, returning `None` when the file does not exist.
    ///
    /// A file that exists but does not parse is an error, never `None`.
    pub fn load_optional<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match io::read_optional_text(path)? {
            Some(content) => Self::parse(path, &content).map(Some),
            None => Ok(None),
        }
    }

    /// Save a record atomically.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let content = match extension(path).as_str() {
            "toml" => toml::to_string_pretty(value).map_err(|e| Error::ConfigSerialize {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            })?,
            "json" => {
                let mut json =
                    serde_json::to_string_pretty(value).map_err(|e| Error::ConfigSerialize {
                        path: path.to_path_buf(),
                        format: "JSON".into(),
                        message: e.to_string(),
                    })?;
                json.push('\n');
                json
            }
            other => {
                return Err(Error::UnsupportedFormat {
                    extension: other.to_string(),
                });
            }
        };

        io::write_atomic(path, content.as_bytes())
    }

    fn parse<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
        match extension(path).as_str() {
            "toml" => toml::from_str(content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            }),
            "json" => serde_json::from_str(content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "JSON".into(),
                message: e.to_string(),
            }),
            other => Err(Error::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
