//! Keysmith Core - project configuration for credential management
//!
//! This crate provides the project configuration file (`keysmith.toml` /
//! `keysmith.yaml`), its discovery and validation, and the error types shared
//! by the configuration layer.

pub mod config;
pub mod error;

pub use config::{
    find_config, load_config, load_config_from_dir, AndroidConfig, ApiConfig, AppleConfig,
    IosConfig, IosTargetConfig, ProjectConfig,
};
pub use error::{ConfigError, CoreError, Result};
