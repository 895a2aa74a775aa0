// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchgate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchgate",
    version,
    about = "Watch a workspace, run lint/build/test on change, promote staged files when the gate passes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML, or YAML by `.yaml`/`.yml` extension).
    ///
    /// If omitted, `WATCHGATE_CONFIG` is used, then `settings/config.toml`
    /// (or `settings/config.yaml` if only that exists).
    /// A missing file is not fatal: built-in defaults are used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Run the pipeline once (reason `manual`), print the result and exit.
    #[arg(long)]
    pub once: bool,

    /// Stage a file into the mirror before doing anything else.
    ///
    /// Takes the workspace-relative destination and the local file whose
    /// bytes should be staged.
    #[arg(long, num_args = 2, value_names = ["RELATIVE", "SOURCE"])]
    pub stage: Option<Vec<String>>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHGATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load config, print the effective settings, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_takes_two_values() {
        let args = CliArgs::try_parse_from([
            "watchgate",
            "--stage",
            "foo/bar.txt",
            "/tmp/bar.txt",
            "--once",
        ])
        .unwrap();

        assert!(args.once);
        assert_eq!(
            args.stage,
            Some(vec!["foo/bar.txt".to_string(), "/tmp/bar.txt".to_string()])
        );
        assert!(args.config.is_none());
    }
}
