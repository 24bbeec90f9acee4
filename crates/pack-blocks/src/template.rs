//! Placeholder substitution over template text.
//!
//! Placeholders are written `__KEY__`, where `KEY` is upper-case ASCII
//! letters and digits separated by single underscores (`__REPO_NAME__`).
//! Templates may also carry edit hints, reviewer-facing comment lines of the
//! form `<!-- EDIT: ... -->` that never reach a rendered file.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__([A-Z0-9]+(?:_[A-Z0-9]+)*)__").expect("Invalid placeholder regex")
});

static EDIT_HINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*<!--[ \t]*EDIT:.*-->[ \t]*(?:\r?\n|$)")
        .expect("Invalid edit hint regex")
});

/// Render `template` against `values`.
///
/// Every placeholder whose key is present in `values` is replaced; unknown
/// placeholders are left verbatim. Edit-hint lines are removed. Substitution
/// is a single pass, so a value that itself looks like a placeholder is not
/// expanded again.
///
/// With `emit_warnings`, each placeholder left in the output is reported
/// through `tracing`.
///
/// # Example
/// ```
/// use std::collections::BTreeMap;
/// use pack_blocks::template::substitute;
///
/// let values = BTreeMap::from([("NAME".to_string(), "World".to_string())]);
/// assert_eq!(substitute("Hello __NAME__", &values, false), "Hello World");
/// ```
pub fn substitute(template: &str, values: &BTreeMap<String, String>, emit_warnings: bool) -> String {
    let stripped = strip_edit_hints(template);
    let rendered = PLACEHOLDER_REGEX
        .replace_all(&stripped, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned();

    if emit_warnings {
        for token in find_unreplaced_placeholders(&rendered) {
            tracing::warn!(placeholder = %token, "placeholder has no value and was left in place");
        }
    }

    rendered
}

/// Remove every line that consists solely of an edit hint.
pub fn strip_edit_hints(text: &str) -> String {
    EDIT_HINT_REGEX.replace_all(text, "").into_owned()
}

/// Return the distinct placeholder tokens (`__KEY__`) still present in `text`.
pub fn find_unreplaced_placeholders(text: &str) -> BTreeSet<String> {
    PLACEHOLDER_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
