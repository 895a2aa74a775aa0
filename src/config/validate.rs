// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchgateError};
use crate::watch::patterns::IgnoreRules;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WatchgateError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.watch,
            raw.mirror,
            raw.pipeline,
            raw.runtime,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch(cfg)?;
    validate_mirror(cfg)?;
    validate_pipeline(cfg)?;
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.base_path.as_os_str().is_empty() {
        return Err(WatchgateError::ConfigError(
            "[watch].basePath must not be empty".to_string(),
        ));
    }

    if cfg.watch.debounce_ms == 0 {
        return Err(WatchgateError::ConfigError(
            "[watch].debounceMs must be >= 1 (got 0)".to_string(),
        ));
    }

    // Compile once here so a bad glob is reported at load time rather than
    // when the watcher starts.
    IgnoreRules::compile(&cfg.watch.ignored)?;

    Ok(())
}

fn validate_mirror(cfg: &RawConfigFile) -> Result<()> {
    if cfg.mirror.base_path.as_os_str().is_empty() {
        return Err(WatchgateError::ConfigError(
            "[mirror].basePath must not be empty".to_string(),
        ));
    }

    if cfg.mirror.resolved_base_path() == cfg.watch.resolved_base_path() {
        return Err(WatchgateError::ConfigError(format!(
            "[mirror].basePath must differ from [watch].basePath (both are {:?})",
            cfg.watch.base_path
        )));
    }

    Ok(())
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    let pipeline = &cfg.pipeline;

    if pipeline.timeout_ms == 0 {
        return Err(WatchgateError::ConfigError(
            "[pipeline].timeoutMs must be >= 1 (got 0)".to_string(),
        ));
    }

    if pipeline.build_command.is_blank() {
        return Err(WatchgateError::ConfigError(
            "[pipeline].buildCommand must not be empty".to_string(),
        ));
    }

    if pipeline.test_command.is_blank() {
        return Err(WatchgateError::ConfigError(
            "[pipeline].testCommand must not be empty".to_string(),
        ));
    }

    if let Some(lint) = &pipeline.lint_command {
        if lint.is_blank() {
            return Err(WatchgateError::ConfigError(
                "[pipeline].lintCommand must not be empty when present".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::CommandSpec;

    #[test]
    fn defaults_are_valid() {
        assert!(ConfigFile::try_from(RawConfigFile::default()).is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.pipeline.timeout_ms = 0;

        match ConfigFile::try_from(raw) {
            Err(WatchgateError::ConfigError(msg)) => assert!(msg.contains("timeoutMs")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn blank_lint_command_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.pipeline.lint_command = Some(CommandSpec::Shell("   ".to_string()));

        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn bad_ignore_glob_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.ignored.push("src/[unclosed".to_string());

        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn mirror_cannot_be_the_workspace() {
        let mut raw = RawConfigFile::default();
        raw.mirror.base_path = raw.watch.base_path.clone();

        assert!(ConfigFile::try_from(raw).is_err());
    }
}
