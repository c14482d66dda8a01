use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

use crate::ToolkitConfig;

pub const CONFIG_FILE_NAME: &str = "toolkit.toml";
pub const ENV_PREFIX: &str = "TOOLKIT";

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Load `toolkit.toml` (defaults if absent), then apply `TOOLKIT__SECTION__KEY` overrides.
    pub fn load(&self) -> Result<ToolkitConfig> {
        let config_path = self.config_path();

        let mut builder = Config::builder();
        if config_path.exists() {
            builder = builder.add_source(File::new(
                config_path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<ToolkitConfig> {
        let config = self.load()?;

        if config.toolkit.operation.trim().is_empty() {
            return Err(anyhow!("toolkit.operation must not be empty"));
        }

        if config.host.epoch_interruption && config.host.epoch_deadline == 0 {
            return Err(anyhow!(
                "host.epoch_deadline must be greater than 0 when epoch_interruption is enabled"
            ));
        }

        if config.host.max_guest_log_len == 0 {
            return Err(anyhow!("host.max_guest_log_len must be greater than 0"));
        }

        Ok(config)
    }
}
