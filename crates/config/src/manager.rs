//! Configuration manager - main API for config operations

use crate::error::join_errors;
use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult, LogLevel};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

/// Environment overrides, applied on top of the file
pub const ENV_STATE_PATH: &str = "DUELRANK_APP_STATE_PATH";
pub const ENV_LOG_LEVEL: &str = "DUELRANK_APP_LOG_LEVEL";
pub const ENV_REMOTE_ENDPOINT: &str = "DUELRANK_REMOTE_ENDPOINT";
pub const ENV_REMOTE_ENABLED: &str = "DUELRANK_REMOTE_ENABLED";

/// Main configuration manager
///
/// Owns the config directory. The local state file lives there too unless
/// `app.state_path` is absolute.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a config manager for the platform config directory
    ///
    /// - Linux: `~/.config/duelrank/`
    /// - macOS: `~/Library/Application Support/duelrank/`
    /// - Windows: `%APPDATA%\duelrank\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let persistence = ConfigPersistence::new(config_dir.join(CONFIG_FILE));
        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "duelrank")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::NoConfigDir {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Resolves `app.state_path` against the config directory
    pub fn state_path(&self, config: &Config) -> PathBuf {
        if config.app.state_path.is_absolute() {
            config.app.state_path.clone()
        } else {
            self.config_dir.join(&config.app.state_path)
        }
    }

    /// Loads the configuration from file
    ///
    /// A missing file yields defaults; a damaged one is an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, logging and falling back to defaults on error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Validates and saves the configuration
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads, applies `update_fn`, and saves
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use duelrank_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.remote.enabled = true;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if none exists
    ///
    /// Returns Ok(true) if a new file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.save(&Config::default())?;
        log::info!("Generated default config at {}", self.config_path().display());
        Ok(true)
    }

    /// Overwrites the config file with defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current config file, returning one message per problem
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the file and applies `DUELRANK_*` environment overrides
    ///
    /// Unparsable override values are logged and ignored.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {}",
                join_errors(&errors)
            );
        }

        Ok(config)
    }
}

/// Applies overrides from any key/value source
pub(crate) fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(ENV_STATE_PATH) {
        config.app.state_path = PathBuf::from(path);
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        match level.parse::<LogLevel>() {
            Ok(level) => config.app.log_level = level,
            Err(e) => log::warn!("Ignoring {}: {}", ENV_LOG_LEVEL, e),
        }
    }

    if let Some(endpoint) = lookup(ENV_REMOTE_ENDPOINT) {
        config.remote.endpoint = endpoint;
    }

    if let Some(enabled) = lookup(ENV_REMOTE_ENABLED) {
        match enabled.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => config.remote.enabled = true,
            "0" | "false" | "no" | "off" => config.remote.enabled = false,
            other => log::warn!("Ignoring {}: '{}' is not a boolean", ENV_REMOTE_ENABLED, other),
        }
    }
}
