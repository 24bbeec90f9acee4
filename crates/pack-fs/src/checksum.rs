//! SHA-256 checksum utilities
//!
//! All digests are lowercase hex without a prefix; this is the form stored
//! in the file manifest and the trust store.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{Error, Result};

/// Compute the SHA-256 digest of raw bytes.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 digest of string content.
pub fn sha256_content(content: &str) -> String {
    sha256_bytes(content.as_bytes())
}

/// Compute the SHA-256 digest of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(sha256_bytes(&content))
}

/// Whether `value` looks like a digest produced by this module.
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
