//! Components and their install actions.
//!
//! A component is one installable unit inside a pack. Its id is globally
//! unique; pack-scoped ids carry the pack identifier as a prefix
//! (`ios.xcodebuild-mcp`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One installable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    #[serde(default)]
    pub pack_identifier: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Ids of components that must be installed first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub is_required: bool,
    pub install_action: InstallAction,
}

impl Component {
    /// A component that belongs to no pack.
    pub fn new(id: impl Into<String>, install_action: InstallAction) -> Self {
        Self {
            id: id.into(),
            pack_identifier: None,
            description: None,
            dependencies: Vec::new(),
            is_required: false,
            install_action,
        }
    }

    /// A pack-scoped component; the id becomes `<pack>.<name>`.
    pub fn in_pack(pack: &str, name: &str, install_action: InstallAction) -> Self {
        Self {
            id: format!("{}.{}", pack, name),
            pack_identifier: Some(pack.to_string()),
            ..Self::new(String::new(), install_action)
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}

/// What installing a component does. Closed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InstallAction {
    /// Register a named service entry (a command or URL the host tool runs).
    ServiceEntry(ServiceEntry),
    /// Install a system package.
    #[serde(rename_all = "camelCase")]
    Package { name: String },
    /// Install a host-tool plugin (`name` or `name@marketplace`).
    #[serde(rename_all = "camelCase")]
    Plugin { name: String },
    /// Run an inline shell command.
    #[serde(rename_all = "camelCase")]
    ShellCommand { command: String },
    /// Copy a file from the pack into the scope.
    #[serde(rename_all = "camelCase")]
    CopyFile {
        source: String,
        destination: String,
        kind: CopyFileKind,
    },
    /// Append entries to the global gitignore.
    #[serde(rename_all = "camelCase")]
    GitignoreEntries { entries: Vec<String> },
    /// Deep-merge a settings fragment into the scope's settings file.
    #[serde(rename_all = "camelCase")]
    SettingsMerge { settings: serde_json::Value },
    /// Merge a settings file shipped with the pack.
    #[serde(rename_all = "camelCase")]
    SettingsFile { source: String },
}

impl InstallAction {
    pub fn package_name(&self) -> Option<&str> {
        match self {
            Self::Package { name } => Some(name),
            _ => None,
        }
    }

    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Self::Plugin { name } => Some(name),
            _ => None,
        }
    }

    pub fn service_entry(&self) -> Option<&ServiceEntry> {
        match self {
            Self::ServiceEntry(entry) => Some(entry),
            _ => None,
        }
    }

    /// Pack-relative file this action reads, if any.
    pub fn source_file(&self) -> Option<&str> {
        match self {
            Self::CopyFile { source, .. } | Self::SettingsFile { source } => Some(source),
            _ => None,
        }
    }

    /// Short label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceEntry(_) => "service-entry",
            Self::Package { .. } => "package",
            Self::Plugin { .. } => "plugin",
            Self::ShellCommand { .. } => "shell-command",
            Self::CopyFile { .. } => "copy-file",
            Self::GitignoreEntries { .. } => "gitignore-entries",
            Self::SettingsMerge { .. } => "settings-merge",
            Self::SettingsFile { .. } => "settings-file",
        }
    }
}

/// A named service entry registered with the host tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub name: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub scope: ServiceScope,
}

impl ServiceEntry {
    pub fn command(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: Some(command.into()),
            args: Vec::new(),
            url: None,
            env: BTreeMap::new(),
            scope: ServiceScope::default(),
        }
    }

    /// The full command line, when the entry runs a local command.
    pub fn command_line(&self) -> Option<String> {
        self.command.as_ref().map(|cmd| {
            std::iter::once(cmd.as_str())
                .chain(self.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

/// Where the host tool stores a service entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScope {
    /// Private to one project, stored in the user's config.
    #[default]
    Local,
    /// Shared with the project's collaborators.
    Project,
    /// Available everywhere for this user.
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyFileKind {
    Skill,
    Hook,
    Command,
    Agent,
    Generic,
}

/// Whether two textual plugin names denote the same plugin.
///
/// `name` and `name@marketplace` are the same plugin; two fully qualified
/// names must match exactly.
pub fn plugin_names_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (a.split_once('@'), b.split_once('@')) {
        (Some(_), Some(_)) => false,
        (Some((bare, _)), None) => bare == b,
        (None, Some((bare, _))) => bare == a,
        (None, None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_pack_prefixes_id() {
        let c = Component::in_pack("ios", "xcode", InstallAction::Package { name: "xcbeautify".into() });
        assert_eq!(c.id, "ios.xcode");
        assert_eq!(c.pack_identifier.as_deref(), Some("ios"));
    }

    #[test]
    fn install_action_serializes_with_type_tag() {
        let action = InstallAction::ServiceEntry(ServiceEntry::command("docs", "npx docs-server"));
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "serviceEntry");
        assert_eq!(json["name"], "docs");
        assert_eq!(json["scope"], "local");

        let back: InstallAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn plugin_name_forms() {
        assert!(plugin_names_match("swift-lsp", "swift-lsp@official"));
        assert!(plugin_names_match("swift-lsp@official", "swift-lsp"));
        assert!(plugin_names_match("swift-lsp@official", "swift-lsp@official"));
        assert!(!plugin_names_match("swift-lsp@official", "swift-lsp@fork"));
        assert!(!plugin_names_match("swift-lsp", "swift"));
    }

    #[test]
    fn command_line_joins_args() {
        let mut entry = ServiceEntry::command("docs", "npx");
        entry.args = vec!["-y".into(), "docs-server".into()];
        assert_eq!(entry.command_line().as_deref(), Some("npx -y docs-server"));
    }
}
