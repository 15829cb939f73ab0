//! Shared runtime state for CLI interactions and command execution.

use std::{future::Future, path::PathBuf, sync::Arc};

use subfox_config::{Config, ConfigManager};
use subfox_core::SessionController;
use subfox_storage_json::JsonCacheStore;
use tokio::runtime::Runtime;

use super::registry::CommandRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub runtime: Runtime,
    pub controller: SessionController,
    pub cache: Arc<JsonCacheStore>,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub data_dir: PathBuf,
}

impl ShellContext {
    /// Drives an engine or controller future to completion on the shell's
    /// runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
