//! Span model of a generated file.
//!
//! A file is read once, line by line, into an ordered list of spans that
//! together cover every byte of the input:
//!
//! - `User` spans: text outside any well-formed marker pair
//! - `Section` spans: a begin line, inner content, and the matching end line
//!
//! All edits are expressed as replacing the bytes of one span, which is what
//! keeps user content byte-identical across rewrites.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static BEGIN_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!-- pack:begin ([A-Za-z0-9._-]+) v([0-9A-Za-z.+-]+) -->$")
        .expect("Invalid begin marker regex")
});

static END_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!-- pack:end ([A-Za-z0-9._-]+) -->$").expect("Invalid end marker regex")
});

/// Opening marker line for a section (without line terminator).
pub fn begin_marker(id: &str, version: &str) -> String {
    format!("<!-- pack:begin {} v{} -->", id, version)
}

/// Closing marker line for a section (without line terminator).
pub fn end_marker(id: &str) -> String {
    format!("<!-- pack:end {} -->", id)
}

/// What a span holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    /// Free-form text owned by the user.
    User,
    /// A well-formed managed section.
    Section { id: String, version: String },
}

/// A contiguous byte range of the parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    /// Full extent, markers included for sections.
    pub range: Range<usize>,
    /// For sections, the bytes between the begin and end lines.
    /// For user spans, identical to `range`.
    pub inner: Range<usize>,
    /// For sections, the begin marker line without its terminator.
    pub begin_line: Range<usize>,
}

#[derive(Debug)]
enum Marker {
    Begin { id: String, version: String },
    End { id: String },
}

#[derive(Debug)]
struct Line {
    /// Start of the line
    start: usize,
    /// End of the visible text (line terminator excluded)
    text_end: usize,
    /// End including the terminator
    end: usize,
    marker: Option<Marker>,
}

/// A parsed generated file.
#[derive(Debug)]
pub struct Document<'a> {
    text: &'a str,
    spans: Vec<Span>,
    unpaired: BTreeSet<String>,
    duplicated: BTreeSet<String>,
}

impl<'a> Document<'a> {
    /// Parse `text` into spans with one linear pass over its lines.
    pub fn parse(text: &'a str) -> Self {
        let lines = scan_lines(text);
        let mut spans: Vec<Span> = Vec::new();
        let mut unpaired = BTreeSet::new();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();

        let mut i = 0;
        while i < lines.len() {
            if let Some(Marker::Begin { id, version }) = &lines[i].marker {
                match find_close(&lines, i, id) {
                    Some(j) => {
                        // A foreign begin marker inside this block cannot be
                        // edited on its own
                        for nested in &lines[i + 1..j] {
                            if let Some(Marker::Begin { id: nested_id, .. }) = &nested.marker {
                                tracing::debug!(section = %nested_id, enclosing = %id, "begin marker nested in another section");
                                unpaired.insert(nested_id.clone());
                            }
                        }
                        *seen.entry(id.clone()).or_default() += 1;
                        let range = lines[i].start..lines[j].end;
                        spans.push(Span {
                            kind: SpanKind::Section {
                                id: id.clone(),
                                version: version.clone(),
                            },
                            inner: lines[i].end..lines[j].start,
                            begin_line: lines[i].start..lines[i].text_end,
                            range,
                        });
                        i = j + 1;
                        continue;
                    }
                    None => {
                        tracing::debug!(section = %id, "begin marker without matching end");
                        unpaired.insert(id.clone());
                    }
                }
            }

            let line_range = lines[i].start..lines[i].end;
            match spans.last_mut() {
                Some(last) if last.kind == SpanKind::User => {
                    last.range.end = line_range.end;
                    last.inner.end = line_range.end;
                    last.begin_line.end = line_range.end;
                }
                _ => spans.push(Span {
                    kind: SpanKind::User,
                    range: line_range.clone(),
                    inner: line_range.clone(),
                    begin_line: line_range,
                }),
            }
            i += 1;
        }

        let duplicated = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id)
            .collect();

        Self {
            text,
            spans,
            unpaired,
            duplicated,
        }
    }

    /// The text this document was parsed from.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// All spans in file order.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Section ids that have a begin marker with no matching end marker, or
    /// whose begin marker sits inside another section.
    pub fn unpaired(&self) -> &BTreeSet<String> {
        &self.unpaired
    }

    /// Whether automated edits may touch the section `id`.
    ///
    /// A section is off limits when any of its begin markers is unpaired or
    /// when it occurs more than once: in both cases there is no single block
    /// that can be rewritten without guessing.
    pub fn is_editable(&self, id: &str) -> bool {
        !self.unpaired.contains(id) && !self.duplicated.contains(id)
    }

    /// The first well-formed section span with the given id.
    pub fn section(&self, id: &str) -> Option<&Span> {
        self.spans
            .iter()
            .find(|span| matches!(&span.kind, SpanKind::Section { id: sid, .. } if sid == id))
    }

    /// Whether any begin marker for `id` appears in the text.
    pub fn mentions(&self, id: &str) -> bool {
        self.section(id).is_some() || self.unpaired.contains(id)
    }

    /// Bytes covered by `span`.
    pub fn span_text(&self, span: &Span) -> &'a str {
        &self.text[span.range.clone()]
    }

    /// Inner bytes of `span` (markers excluded for sections).
    pub fn inner_text(&self, span: &Span) -> &'a str {
        &self.text[span.inner.clone()]
    }

    /// Whether the document contains any well-formed section.
    pub fn has_sections(&self) -> bool {
        self.spans
            .iter()
            .any(|span| matches!(span.kind, SpanKind::Section { .. }))
    }
}

/// Index of the end line closing the begin marker at `open`.
///
/// A second begin marker for the same id before the end marker means the
/// first one is unpaired.
fn find_close(lines: &[Line], open: usize, id: &str) -> Option<usize> {
    for (offset, line) in lines[open + 1..].iter().enumerate() {
        match &line.marker {
            Some(Marker::End { id: end_id }) if end_id == id => return Some(open + 1 + offset),
            Some(Marker::Begin { id: begin_id, .. }) if begin_id == id => return None,
            _ => {}
        }
    }
    None
}

fn scan_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        let start = offset;
        let end = offset + raw.len();
        let visible = raw.strip_suffix('\n').unwrap_or(raw);
        let visible = visible.strip_suffix('\r').unwrap_or(visible);
        let text_end = start + visible.len();
        lines.push(Line {
            start,
            text_end,
            end,
            marker: classify(visible.trim()),
        });
        offset = end;
    }
    lines
}

fn classify(line: &str) -> Option<Marker> {
    if !line.starts_with("<!-- pack:") {
        return None;
    }
    if let Some(caps) = BEGIN_MARKER_REGEX.captures(line) {
        return Some(Marker::Begin {
            id: caps[1].to_string(),
            version: caps[2].to_string(),
        });
    }
    END_MARKER_REGEX
        .captures(line)
        .map(|caps| Marker::End {
            id: caps[1].to_string(),
        })
}
