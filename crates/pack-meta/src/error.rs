//! Error types for pack-meta

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Dependency cycle detected at component '{id}'")]
    DependencyCycle { id: String },

    #[error("Unknown component '{id}'{}", required_by_suffix(.required_by))]
    UnknownComponent {
        id: String,
        required_by: Option<String>,
    },

    #[error("Component '{id}' must be prefixed with '{pack}.'")]
    InvalidComponentId { id: String, pack: String },

    #[error("Component '{id}' declares pack '{declared}' but is listed in pack '{pack}'")]
    ComponentPackMismatch {
        id: String,
        declared: String,
        pack: String,
    },

    #[error("Component '{id}' is declared by both '{first}' and '{second}'")]
    DuplicateComponent {
        id: String,
        first: String,
        second: String,
    },

    #[error("Section '{id}' is contributed by both '{first}' and '{second}'")]
    DuplicateSection {
        id: String,
        first: String,
        second: String,
    },

    #[error("Pack '{id}' is registered twice")]
    DuplicatePack { id: String },

    #[error("Invalid version '{version}' for pack '{pack}': {source}")]
    InvalidVersion {
        pack: String,
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Template '{section}' in pack '{pack}' has no inline content")]
    MissingTemplateContent { pack: String, section: String },
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(parent) => format!(" (required by '{}')", parent),
        None => String::new(),
    }
}
