//! duelrank configuration
//!
//! A TOML file with one table per concern. Every section implements
//! [`ConfigSection`], so it validates and merges itself, and every field has a
//! default so a partial (or missing) file still yields a usable config.
//!
//! - `[app]`: where the local rating state lives and how loud logging is
//! - `[reorder]`: numeric tuning of the manual reorder adjuster
//! - `[remote]`: the sync endpoint, timeouts and circuit breaker
//!
//! Writes are atomic and the previous file is kept as `config.toml.backup`.
//!
//! # Example
//!
//! ```rust
//! use duelrank_config::{Config, ConfigManager};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let manager = ConfigManager::with_directory(dir.path().to_path_buf()).unwrap();
//! let config = manager.load_or_default();
//!
//! assert!(!config.remote.enabled);
//! assert_eq!(config.reorder.tuning().edge_offset, 0.001);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
pub mod app_config;
pub mod remote_config;
pub mod reorder_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{
    ConfigManager, ENV_LOG_LEVEL, ENV_REMOTE_ENABLED, ENV_REMOTE_ENDPOINT, ENV_STATE_PATH,
};
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use remote_config::RemoteConfig;
pub use reorder_config::ReorderConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Manual reorder tuning
    pub reorder: ReorderConfig,

    /// Remote synchronization
    pub remote: RemoteConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.reorder.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.remote.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    ///
    /// Override chain: defaults < file < env vars < CLI args
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.reorder.merge(other.reorder);
        self.remote.merge(other.remote);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            reorder: ReorderConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_version_is_set() {
        assert_eq!(Config::default().version, CONFIG_VERSION);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.remote.enabled = true;
        other.reorder.edge_offset = 0.01;

        base.merge(other);
        assert!(base.remote.enabled);
        assert_eq!(base.reorder.edge_offset, 0.01);
    }

    #[test]
    fn test_errors_are_collected_across_sections() {
        let mut config = Config::default();
        config.reorder.sigma_shrink = 2.0;
        config.remote.failure_threshold = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[remote]\nenabled = true\n").unwrap();
        assert!(config.remote.enabled);
        assert_eq!(config.app, AppConfig::default());
        assert_eq!(config.version, CONFIG_VERSION);
    }
}
