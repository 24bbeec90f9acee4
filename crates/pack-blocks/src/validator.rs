//! Drift detection and repair for managed sections.
//!
//! Installed content is compared to the freshly rendered expected content,
//! not just by version tag: a hand edit inside a section is drift even when
//! the version still matches. Sections present in the file but not expected
//! (for instance from a pack that has since left the catalog) are reported
//! as unmanaged and left alone.

use std::path::Path;

use similar::TextDiff;

use crate::composer::{parse_sections, replace_section, trim_blank_lines};
use crate::document::Document;
use crate::error::Result;

/// Installed version reported for an expected section that is not in the file.
pub const MISSING_VERSION: &str = "(missing)";

/// What a section should contain after rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSection {
    pub identifier: String,
    pub version: String,
    pub content: String,
}

impl ExpectedSection {
    pub fn new(
        identifier: impl Into<String>,
        version: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    UpToDate,
    Outdated,
    /// Present in the file but not expected; never counted as outdated.
    Unmanaged,
}

/// Validation outcome for one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStatus {
    pub identifier: String,
    pub state: SectionState,
    /// Version tag found in the file, or [`MISSING_VERSION`].
    pub installed_version: String,
    /// `None` for unmanaged sections.
    pub expected_version: Option<String>,
    /// Whether the section's markers are malformed (unpaired or repeated).
    pub malformed: bool,
    /// Unified diff from installed to expected content, for outdated
    /// sections that are present.
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub sections: Vec<SectionStatus>,
}

impl ValidationResult {
    pub fn has_outdated(&self) -> bool {
        self.sections.iter().any(|s| s.state == SectionState::Outdated)
    }

    pub fn outdated_identifiers(&self) -> Vec<&str> {
        self.identifiers_in(SectionState::Outdated)
    }

    pub fn unmanaged_identifiers(&self) -> Vec<&str> {
        self.identifiers_in(SectionState::Unmanaged)
    }

    pub fn status(&self, identifier: &str) -> Option<&SectionStatus> {
        self.sections.iter().find(|s| s.identifier == identifier)
    }

    fn identifiers_in(&self, state: SectionState) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.state == state)
            .map(|s| s.identifier.as_str())
            .collect()
    }
}

/// Result of [`fix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixResult {
    pub content: String,
    pub changed: bool,
    /// Sections rewritten or appended.
    pub repaired: Vec<String>,
    /// Outdated sections left alone because their markers are malformed.
    pub skipped: Vec<String>,
}

/// Compare every expected section against `text`.
pub fn validate(text: &str, expected: &[ExpectedSection]) -> ValidationResult {
    let doc = Document::parse(text);
    let installed = parse_sections(text);
    let mut sections = Vec::with_capacity(expected.len());

    for exp in expected {
        let want = trim_blank_lines(&exp.content);
        let malformed = !doc.is_editable(&exp.identifier);
        let status = match installed.iter().find(|s| s.identifier == exp.identifier) {
            Some(found) if found.content == want => SectionStatus {
                identifier: exp.identifier.clone(),
                state: SectionState::UpToDate,
                installed_version: found.version.clone(),
                expected_version: Some(exp.version.clone()),
                malformed,
                diff: None,
            },
            Some(found) => SectionStatus {
                identifier: exp.identifier.clone(),
                state: SectionState::Outdated,
                installed_version: found.version.clone(),
                expected_version: Some(exp.version.clone()),
                malformed,
                diff: Some(unified_diff(&found.content, &want)),
            },
            None => SectionStatus {
                identifier: exp.identifier.clone(),
                state: SectionState::Outdated,
                installed_version: MISSING_VERSION.to_string(),
                expected_version: Some(exp.version.clone()),
                malformed,
                diff: None,
            },
        };
        sections.push(status);
    }

    for found in &installed {
        let managed = expected.iter().any(|e| e.identifier == found.identifier);
        let already = sections.iter().any(|s| s.identifier == found.identifier);
        if !managed && !already {
            tracing::debug!(section = %found.identifier, "unmanaged section skipped");
            sections.push(SectionStatus {
                identifier: found.identifier.clone(),
                state: SectionState::Unmanaged,
                installed_version: found.version.clone(),
                expected_version: None,
                malformed: !doc.is_editable(&found.identifier),
                diff: None,
            });
        }
    }

    ValidationResult { sections }
}

/// Re-render every outdated section whose markers are well-formed.
///
/// Running `fix` on its own output reports `changed == false`.
pub fn fix(text: &str, expected: &[ExpectedSection]) -> FixResult {
    let result = validate(text, expected);
    let mut current = text.to_string();
    let mut repaired = Vec::new();
    let mut skipped = Vec::new();

    for id in result.outdated_identifiers() {
        let Some(exp) = expected.iter().find(|e| e.identifier == id) else {
            continue;
        };
        if !Document::parse(&current).is_editable(id) {
            tracing::warn!(section = %id, "outdated section has malformed markers; skipping repair");
            skipped.push(id.to_string());
            continue;
        }
        current = replace_section(&current, id, &exp.content, &exp.version);
        repaired.push(id.to_string());
    }

    FixResult {
        changed: current != text,
        content: current,
        repaired,
        skipped,
    }
}

/// [`validate`] over a file; a missing file has every section missing.
pub fn validate_file(path: &Path, expected: &[ExpectedSection]) -> Result<ValidationResult> {
    let text = pack_fs::io::read_optional_text(path)?.unwrap_or_default();
    Ok(validate(&text, expected))
}

/// [`fix`] over a file, writing it back atomically only when it changed.
pub fn fix_file(path: &Path, expected: &[ExpectedSection]) -> Result<FixResult> {
    let text = pack_fs::io::read_optional_text(path)?.unwrap_or_default();
    let result = fix(&text, expected);
    if result.changed {
        pack_fs::io::write_text(path, &result.content)?;
        tracing::info!(path = %path.display(), sections = ?result.repaired, "repaired sections");
    }
    Ok(result)
}

fn unified_diff(installed: &str, expected: &str) -> String {
    TextDiff::from_lines(installed, expected)
        .unified_diff()
        .header("installed", "expected")
        .to_string()
}
