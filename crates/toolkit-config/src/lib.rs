pub mod global;
pub mod loader;

pub use global::{LogFormat, LoggingConfig, ToolkitConfig, ToolkitSettings};
pub use loader::ConfigLoader;
