// src/config/mod.rs

//! Configuration loading and validation for watchgate.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a config file from disk, TOML or YAML (`loader.rs`).
//! - Validate commands, timeouts and ignore globs (`validate.rs`).
//! - Hold the current snapshot and reload it on request (`provider.rs`).
//! - Create the runtime directories the config asks for (`runtime_dirs.rs`).

pub mod loader;
pub mod model;
pub mod provider;
pub mod runtime_dirs;
pub mod validate;

pub use loader::{
    default_config_path, load_and_validate, load_from_path, load_or_default,
    resolve_config_path, CONFIG_ENV_VAR,
};
pub use model::{
    CommandSpec, ConfigFile, MirrorSection, PipelineSection, RawConfigFile, RuntimeSection,
    WatchSection,
};
pub use provider::ConfigProvider;
pub use runtime_dirs::ensure_runtime_dirs;
