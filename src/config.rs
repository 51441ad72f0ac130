//! Configuration loading
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML file, then `SHOWSHELF_*` environment variables. Nested keys use a
//! double underscore, e.g. `SHOWSHELF_API__TIMEOUT_SECS=10`.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// The config could not be parsed or extracted
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// A value is out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote catalog settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the TVMaze API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://api.tvmaze.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("showshelf/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Catalog store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Upper bound of concurrent show fetches while reconciling favorites
    #[serde(default = "default_max_parallel_fetches")]
    pub max_parallel_fetches: usize,
    /// Capacity of the store event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_parallel_fetches() -> usize {
    4
}

fn default_event_buffer() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_parallel_fetches: default_max_parallel_fetches(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Local storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for favorites, preferences and credentials.
    /// Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Default location of the config file, if the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "showshelf", "showshelf")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration with environment variable overrides
///
/// An explicit `path` must exist. Without one, the default config file is
/// used when present and skipped otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(default_path) = default_config_path().filter(|p| p.exists()) {
                figment = figment.merge(Toml::file(default_path));
            }
        }
    }

    let config: Config = figment
        .merge(Env::prefixed("SHOWSHELF_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Reject values the rest of the crate cannot work with
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
    }
    if config.api.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "api.timeout_secs must be greater than zero".into(),
        ));
    }
    if config.store.max_parallel_fetches == 0 {
        return Err(ConfigError::Invalid(
            "store.max_parallel_fetches must be greater than zero".into(),
        ));
    }
    if config.store.event_buffer == 0 {
        return Err(ConfigError::Invalid(
            "store.event_buffer must be greater than zero".into(),
        ));
    }
    Ok(())
}
