use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use toolkit_bridge::{HostConfig, ManifestOutputFormat, DEFAULT_DECOMPILE_OPERATION};

/// 全局配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub host: HostConfig,
    pub toolkit: ToolkitSettings,
    pub logging: LoggingConfig,
}

/// Toolkit 模块配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolkitSettings {
    pub module_path: PathBuf,
    pub operation: String,
    pub output_format: ManifestOutputFormat,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for ToolkitSettings {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from("./toolkit.wasm"),
            operation: DEFAULT_DECOMPILE_OPERATION.to_string(),
            output_format: ManifestOutputFormat::String,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
