use std::path::{Path, PathBuf};

use command_shim::ShimConfig;

pub struct CliContext {
    config: ShimConfig,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: ShimConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
