#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

pub use watchgate_test_utils::builders;
pub use watchgate_test_utils::fake_executor::ScriptedExecutor;
pub use watchgate_test_utils::{init_tracing, with_timeout};

use watchgate::config::{ConfigFile, ConfigProvider};
use watchgate::fs::RealFileSystem;
use watchgate::gate::Gate;

/// Gate over `cfg` driven by the scripted executor and the real filesystem.
pub fn scripted_gate(cfg: ConfigFile, executor: &ScriptedExecutor) -> Gate {
    Gate::with_parts(
        Arc::new(ConfigProvider::from_config(cfg)),
        Arc::new(executor.clone()),
        Arc::new(RealFileSystem),
    )
}

/// Create workspace and mirror directories under `root`.
pub fn make_dirs(root: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(root.join("workspace"))?;
    std::fs::create_dir_all(root.join("mirror"))?;
    Ok(())
}
