// src/config/model.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::MirrorMode;

/// Configuration as read from disk, before validation.
///
/// Mirrors a document like:
///
/// ```toml
/// [watch]
/// basePath = "./workspace"
/// ignored = ["**/.git/**"]
///
/// [mirror]
/// basePath = "./mirror"
/// mode = "stage-then-promote"
///
/// [pipeline]
/// lintCommand = "cargo clippy"
/// buildCommand = "cargo build"
/// testCommand = { program = "cargo", args = ["test", "--quiet"] }
/// timeoutMs = 900000
///
/// [runtime]
/// requiredDirs = ["logs", "workspace", "mirror"]
/// ```
///
/// Every section and every key is optional; a missing key keeps its built-in
/// default while the rest of the section is taken from the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub mirror: MirrorSection,

    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub runtime: RuntimeSection,
}

/// Validated, immutable configuration snapshot.
///
/// Built via `ConfigFile::try_from(RawConfigFile)`; the provider hands it out
/// behind an `Arc` and replaces it wholesale on reload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub mirror: MirrorSection,
    pub pipeline: PipelineSection,
    pub runtime: RuntimeSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        watch: WatchSection,
        mirror: MirrorSection,
        pipeline: PipelineSection,
        runtime: RuntimeSection,
    ) -> Self {
        Self {
            watch,
            mirror,
            pipeline,
            runtime,
        }
    }

    /// The built-in configuration used when no usable file exists.
    pub fn defaults() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.watch, raw.mirror, raw.pipeline, raw.runtime)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::defaults()
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSection {
    /// Live workspace root. Watched recursively and used as the promotion
    /// destination.
    #[serde(default = "default_watch_base_path")]
    pub base_path: PathBuf,

    /// Glob patterns (relative to `base_path`) whose events are ignored.
    #[serde(default = "default_ignored")]
    pub ignored: Vec<String>,

    /// Quiet period after the last event before a run is triggered.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_watch_base_path() -> PathBuf {
    PathBuf::from("./workspace")
}

fn default_ignored() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/.git/**",
        "**/tmp/**",
        "**/logs/**",
        "**/dist/**",
        "**/target/**",
        "**/*.watchgate.tmp",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_debounce_ms() -> u64 {
    800
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            base_path: default_watch_base_path(),
            ignored: default_ignored(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl WatchSection {
    pub fn resolved_base_path(&self) -> PathBuf {
        resolve(&self.base_path)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// `[mirror]` section: where the staging store lives and whether promotion
/// is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorSection {
    #[serde(default = "default_mirror_base_path")]
    pub base_path: PathBuf,

    #[serde(default)]
    pub mode: MirrorMode,
}

fn default_mirror_base_path() -> PathBuf {
    PathBuf::from("./mirror")
}

impl Default for MirrorSection {
    fn default() -> Self {
        Self {
            base_path: default_mirror_base_path(),
            mode: MirrorMode::default(),
        }
    }
}

impl MirrorSection {
    pub fn resolved_base_path(&self) -> PathBuf {
        resolve(&self.base_path)
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSection {
    #[serde(default = "default_build_command")]
    pub build_command: CommandSpec,

    #[serde(default = "default_test_command")]
    pub test_command: CommandSpec,

    /// Lint is the only optional gate; when absent the pipeline starts at
    /// build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint_command: Option<CommandSpec>,

    /// Timeout applied to each command individually.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_build_command() -> CommandSpec {
    CommandSpec::Shell("cargo build".to_string())
}

fn default_test_command() -> CommandSpec {
    CommandSpec::Shell("cargo test".to_string())
}

fn default_timeout_ms() -> u64 {
    15 * 60 * 1000
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            build_command: default_build_command(),
            test_command: default_test_command(),
            lint_command: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PipelineSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSection {
    /// Directories created (recursively) at startup if they do not exist.
    #[serde(default = "default_required_dirs")]
    pub required_dirs: Vec<PathBuf>,
}

fn default_required_dirs() -> Vec<PathBuf> {
    ["logs", "data", "tmp", "settings", "workspace", "mirror"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            required_dirs: default_required_dirs(),
        }
    }
}

/// A command to run as one pipeline check.
///
/// Two input forms are accepted:
///
/// ```toml
/// buildCommand = "cargo build --all"                             # shell form
/// testCommand = { program = "cargo", args = ["test", "--all"] }  # exec form
/// ```
///
/// The exec form runs the program directly with the given arguments. The
/// shell form is kept for compatibility and is handed to `sh -c`
/// (`cmd /C` on Windows).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Shell(String),
    Exec {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl CommandSpec {
    pub fn exec<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        CommandSpec::Exec {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CommandSpec::Shell(line) => line.trim().is_empty(),
            CommandSpec::Exec { program, .. } => program.trim().is_empty(),
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(line: &str) -> Self {
        CommandSpec::Shell(line.to_string())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Shell(line) => f.write_str(line),
            CommandSpec::Exec { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// Make a configured path absolute against the current working directory.
fn resolve(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
