//! Section composition and in-place editing of generated files.
//!
//! Every edit works on the span model from [`crate::document`]: the target
//! section's bytes are replaced and everything else is copied through
//! untouched. Sections whose markers are malformed are never edited.

use std::collections::BTreeMap;

use crate::document::{Document, SpanKind, begin_marker, end_marker};
use crate::template::substitute;

/// Identifier of the section holding the tool's own core content.
pub const CORE_SECTION_ID: &str = "core";

/// A section parsed out of a generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub identifier: String,
    pub version: String,
    /// Inner content with leading and trailing blank lines removed.
    pub content: String,
}

/// One pack's template contribution to a composed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contribution {
    pub section_id: String,
    pub template: String,
}

impl Contribution {
    pub fn new(section_id: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            template: template.into(),
        }
    }
}

/// Render the core content and every contribution, each wrapped in a marker
/// pair tagged with `version`. Core comes first; blocks are separated by one
/// blank line.
pub fn compose(
    core: &str,
    contributions: &[Contribution],
    values: &BTreeMap<String, String>,
    version: &str,
) -> String {
    std::iter::once((CORE_SECTION_ID, core))
        .chain(
            contributions
                .iter()
                .map(|c| (c.section_id.as_str(), c.template.as_str())),
        )
        .map(|(id, template)| format_block(id, version, &render(template, values)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a template the way [`compose`] does, for use as expected content.
pub fn render(template: &str, values: &BTreeMap<String, String>) -> String {
    trim_blank_lines(&substitute(template, values, true))
}

/// Extract every well-formed section, in file order.
pub fn parse_sections(text: &str) -> Vec<Section> {
    let doc = Document::parse(text);
    doc.spans()
        .iter()
        .filter_map(|span| match &span.kind {
            SpanKind::Section { id, version } => Some(Section {
                identifier: id.clone(),
                version: version.clone(),
                content: trim_blank_lines(doc.inner_text(span)),
            }),
            SpanKind::User => None,
        })
        .collect()
}

/// Everything outside well-formed marker pairs, concatenated.
///
/// A file without sections is returned unchanged.
pub fn extract_user_content(text: &str) -> String {
    let doc = Document::parse(text);
    if !doc.has_sections() {
        return text.to_string();
    }
    doc.spans()
        .iter()
        .filter(|span| span.kind == SpanKind::User)
        .map(|span| doc.span_text(span))
        .collect()
}

/// Replace the content and version tag of section `id`.
///
/// - well-formed block: only its begin line and inner content change
/// - absent: a new block is appended after one blank line
/// - unpaired or duplicated: the input is returned unchanged
pub fn replace_section(text: &str, id: &str, new_content: &str, new_version: &str) -> String {
    let doc = Document::parse(text);
    if !doc.is_editable(id) {
        tracing::warn!(section = %id, "section markers are malformed; leaving it untouched");
        return text.to_string();
    }

    let Some(span) = doc.section(id) else {
        return append_section(text, id, new_version, new_content);
    };

    let terminator = &text[span.begin_line.end..span.inner.start];
    let content = match terminator {
        "\r\n" => trim_blank_lines(new_content).replace('\n', "\r\n"),
        _ => trim_blank_lines(new_content),
    };

    let mut out = String::with_capacity(text.len() + content.len());
    out.push_str(&text[..span.begin_line.start]);
    out.push_str(&begin_marker(id, new_version));
    out.push_str(terminator);
    if !content.is_empty() {
        out.push_str(&content);
        out.push_str(terminator);
    }
    out.push_str(&text[span.inner.end..]);
    out
}

/// Delete section `id` and one adjacent blank line.
///
/// No-op when the section is absent, unpaired or duplicated.
pub fn remove_section(text: &str, id: &str) -> String {
    let doc = Document::parse(text);
    if !doc.is_editable(id) {
        tracing::warn!(section = %id, "section markers are malformed; not removing it");
        return text.to_string();
    }
    let Some(span) = doc.section(id) else {
        return text.to_string();
    };

    let before = &text[..span.range.start];
    let after = &text[span.range.end..];

    if let Some(rest) = strip_leading_blank_line(after) {
        format!("{}{}", before, rest)
    } else if let Some(trimmed) = strip_trailing_blank_line(before) {
        format!("{}{}", trimmed, after)
    } else {
        format!("{}{}", before, after)
    }
}

/// Identifiers whose begin marker has no matching end marker.
pub fn unpaired_sections(text: &str) -> Vec<String> {
    Document::parse(text).unpaired().iter().cloned().collect()
}

/// Append a new block, following the file's line endings.
pub(crate) fn append_section(text: &str, id: &str, version: &str, content: &str) -> String {
    let block = format_block(id, version, &trim_blank_lines(content));
    if text.is_empty() {
        return block;
    }
    let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = text.to_string();
    if !out.ends_with('\n') {
        out.push_str(eol);
    }
    if !out.ends_with("\n\n") && !out.ends_with("\n\r\n") {
        out.push_str(eol);
    }
    out.push_str(&block.replace('\n', eol));
    out
}

fn format_block(id: &str, version: &str, content: &str) -> String {
    if content.is_empty() {
        format!("{}\n{}\n", begin_marker(id, version), end_marker(id))
    } else {
        format!(
            "{}\n{}\n{}\n",
            begin_marker(id, version),
            content,
            end_marker(id)
        )
    }
}

/// Drop leading and trailing whitespace-only lines and the final newline.
pub(crate) fn trim_blank_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return String::new();
    };
    let last = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .unwrap_or(first);
    lines[first..=last].join("\n")
}

fn strip_leading_blank_line(text: &str) -> Option<&str> {
    if text.is_empty() {
        return None;
    }
    match text.find('\n') {
        Some(idx) if text[..idx].trim().is_empty() => Some(&text[idx + 1..]),
        None if text.trim().is_empty() => Some(""),
        _ => None,
    }
}

fn strip_trailing_blank_line(text: &str) -> Option<&str> {
    let without_newline = text.strip_suffix('\n')?;
    let line_start = without_newline.rfind('\n').map(|i| i + 1).unwrap_or(0);
    if without_newline[line_start..].trim().is_empty() {
        Some(&text[..line_start])
    } else {
        None
    }
}
