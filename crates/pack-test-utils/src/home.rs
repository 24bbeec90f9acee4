//! [`TestHome`]: a temporary engine home with helpers for project scopes.

use std::fs;
use std::path::{Path, PathBuf};

use pack_core::{EngineConfig, Scope, ScopeState};
use tempfile::TempDir;

/// A temporary directory holding an engine home (`<tmp>/home`) and any
/// number of project directories (`<tmp>/projects/<name>`).
///
/// # Example
///
/// ```rust,no_run
/// use pack_test_utils::TestHome;
///
/// let home = TestHome::new();
/// let app = home.project("app");
/// home.assert_file_absent(&app.join("AGENTS.local.md"));
/// ```
pub struct TestHome {
    temp_dir: TempDir,
    config: EngineConfig,
}

impl Default for TestHome {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHome {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("home");
        fs::create_dir_all(&home).unwrap();
        let config = EngineConfig::with_home(&home).unwrap();
        Self { temp_dir, config }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create (if needed) and return the project directory `name`.
    pub fn project(&self, name: &str) -> PathBuf {
        let dir = self.root().join("projects").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn project_scope(&self, name: &str) -> Scope {
        Scope::project(self.project(name))
    }

    pub fn load_state(&self, scope: &Scope) -> ScopeState {
        ScopeState::load(&scope.state_path(&self.config)).unwrap()
    }

    /// Contents of the scope's generated file, or an empty string.
    pub fn generated(&self, scope: &Scope) -> String {
        fs::read_to_string(scope.generated_file(&self.config)).unwrap_or_default()
    }

    pub fn write_generated(&self, scope: &Scope, content: &str) {
        let path = scope.generated_file(&self.config);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn assert_file_exists(&self, path: &Path) {
        assert!(path.exists(), "expected {} to exist", path.display());
    }

    pub fn assert_file_absent(&self, path: &Path) {
        assert!(!path.exists(), "expected {} to be absent", path.display());
    }
}
