// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable that redirects where the config file is read from.
pub const CONFIG_ENV_VAR: &str = "WATCHGATE_CONFIG";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// `.yaml` / `.yml` files are parsed as YAML, everything else as TOML. This
/// only performs deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = if is_yaml(path) {
        // An empty YAML document deserializes to unit, not to a map.
        if contents.trim().is_empty() {
            RawConfigFile::default()
        } else {
            serde_yaml::from_str(&contents)?
        }
    } else {
        toml::from_str(&contents)?
    };

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the config at `path`, falling back to built-in defaults when the file
/// is missing, unreadable, malformed or invalid.
///
/// Never fails: problems are logged as warnings.
pub fn load_or_default(path: impl AsRef<Path>) -> ConfigFile {
    let path = path.as_ref();

    if !path.exists() {
        warn!(path = %path.display(), "config not found; using defaults");
        return ConfigFile::defaults();
    }

    match load_and_validate(path) {
        Ok(cfg) => {
            debug!(path = %path.display(), "config loaded");
            cfg
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to load config; using defaults"
            );
            ConfigFile::defaults()
        }
    }
}

/// Pick the config path: explicit CLI value, then `WATCHGATE_CONFIG`, then
/// [`default_config_path`].
pub fn resolve_config_path(cli_value: Option<&str>) -> PathBuf {
    if let Some(p) = cli_value {
        return PathBuf::from(p);
    }
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => default_config_path(),
    }
}

/// `settings/config.toml` relative to the current working directory, or
/// `settings/config.yaml` when only the YAML file exists.
pub fn default_config_path() -> PathBuf {
    default_config_path_in(Path::new(""))
}

fn default_config_path_in(base: &Path) -> PathBuf {
    let settings = base.join("settings");
    let toml_path = settings.join("config.toml");
    if toml_path.exists() {
        return toml_path;
    }
    let yaml_path = settings.join("config.yaml");
    if yaml_path.exists() {
        debug!(path = %yaml_path.display(), "no config.toml; using config.yaml");
        return yaml_path;
    }
    toml_path
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_falls_back_to_yaml_only_when_toml_is_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = dir.path().join("settings");

        assert_eq!(
            default_config_path_in(dir.path()),
            settings.join("config.toml")
        );

        fs::create_dir_all(&settings).unwrap();
        fs::write(settings.join("config.yaml"), "watch:\n  debounceMs: 10\n").unwrap();
        assert_eq!(
            default_config_path_in(dir.path()),
            settings.join("config.yaml")
        );

        fs::write(settings.join("config.toml"), "").unwrap();
        assert_eq!(
            default_config_path_in(dir.path()),
            settings.join("config.toml")
        );
    }
}
