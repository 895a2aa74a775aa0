use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether staged files may be promoted into the live workspace.
///
/// - `StageThenPromote`: files written to the mirror are copied into the
///   workspace after every passing pipeline run (default behaviour).
/// - `ReadOnly`: the mirror is only a place to look at candidate files;
///   promotion is skipped with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MirrorMode {
    StageThenPromote,
    ReadOnly,
}

impl Default for MirrorMode {
    fn default() -> Self {
        MirrorMode::StageThenPromote
    }
}

impl MirrorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorMode::StageThenPromote => "stage-then-promote",
            MirrorMode::ReadOnly => "read-only",
        }
    }
}

impl fmt::Display for MirrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MirrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stage-then-promote" => Ok(MirrorMode::StageThenPromote),
            "read-only" => Ok(MirrorMode::ReadOnly),
            other => Err(format!(
                "invalid mirror mode: {other} (expected \"stage-then-promote\" or \"read-only\")"
            )),
        }
    }
}

/// One gate of the pipeline. Checks always run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckName {
    Lint,
    Build,
    Test,
}

impl CheckName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::Lint => "lint",
            CheckName::Build => "build",
            CheckName::Test => "test",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
