use std::path::Path;

use watchgate::config::{CommandSpec, ConfigFile, RawConfigFile};
use watchgate::types::MirrorMode;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with lint unset, then overrides
/// individual keys. `build()` runs the same validation as a loaded file.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Workspace at `<root>/workspace`, staging at `<root>/mirror`.
    pub fn rooted_at(self, root: &Path) -> Self {
        self.with_workspace(root.join("workspace"))
            .with_mirror(root.join("mirror"))
    }

    pub fn with_workspace(mut self, path: impl AsRef<Path>) -> Self {
        self.config.watch.base_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_mirror(mut self, path: impl AsRef<Path>) -> Self {
        self.config.mirror.base_path = path.as_ref().to_path_buf();
        self
    }

    pub fn mode(mut self, mode: MirrorMode) -> Self {
        self.config.mirror.mode = mode;
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.config.watch.ignored.push(pattern.to_string());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn lint(mut self, cmd: impl Into<CommandSpec>) -> Self {
        self.config.pipeline.lint_command = Some(cmd.into());
        self
    }

    pub fn build_cmd(mut self, cmd: impl Into<CommandSpec>) -> Self {
        self.config.pipeline.build_command = cmd.into();
        self
    }

    pub fn test_cmd(mut self, cmd: impl Into<CommandSpec>) -> Self {
        self.config.pipeline.test_command = cmd.into();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.pipeline.timeout_ms = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
