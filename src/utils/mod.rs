/// TOML configuration with hot reload.
pub mod toml_config;

pub use toml_config::{AdmissionsConfig, AdmissionsConfigManager, ConfigError};
