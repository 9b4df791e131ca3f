//! Configuration management for firecheck.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::DEFAULT_QUOTA_BYTES;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "firecheck";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "storage.db";

/// Prefix of every asset cache name.
pub const CACHE_PREFIX: &str = "apsad-r4";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FIRECHECK_`, sections split on `__`)
/// 2. TOML config file at `~/.config/firecheck/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Document delivery configuration.
    pub delivery: DeliveryConfig,
    /// Session configuration.
    pub session: SessionConfig,
    /// Offline asset cache configuration.
    pub cache: CacheConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/firecheck/storage.db`
    pub database_path: Option<PathBuf>,
    /// Maximum bytes of keys and values the store may hold.
    pub quota_bytes: usize,
}

/// How generated reports reach the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Ask for a save location when running interactively.
    pub save_prompt: bool,
    /// File a native host reads save messages from.
    pub bridge_endpoint: Option<PathBuf>,
    /// Where downloaded reports land.
    /// Defaults to the user's download directory.
    pub downloads_dir: Option<PathBuf>,
    /// Program used to open a downloaded report, e.g. `xdg-open`.
    pub viewer_command: Option<String>,
    /// Program used to share a report.
    pub share_command: Option<String>,
}

/// Session-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of a new session in hours.
    pub ttl_hours: u32,
}

/// Offline asset cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Version string embedded in the cache name.
    pub version: String,
    /// Directory the cached assets are read from.
    pub asset_root: PathBuf,
    /// Directory holding the versioned caches.
    /// Defaults to `~/.local/share/firecheck/cache`
    pub cache_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_hours: 8 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            asset_root: PathBuf::from("assets"),
            cache_dir: None,
        }
    }
}

impl CacheConfig {
    /// Name of the cache for the configured version.
    #[must_use]
    pub fn cache_name(&self) -> String {
        format!("{CACHE_PREFIX}-{}", self.version)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FIRECHECK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.quota_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "quota_bytes must be greater than 0".to_string(),
            });
        }

        if self.session.ttl_hours == 0 {
            return Err(Error::ConfigValidation {
                message: "ttl_hours must be greater than 0".to_string(),
            });
        }

        let version = self.cache.version.trim();
        if version.is_empty() {
            return Err(Error::ConfigValidation {
                message: "cache version must not be empty".to_string(),
            });
        }
        if version.contains(['/', '\\']) || version == "." || version == ".." {
            return Err(Error::ConfigValidation {
                message: format!("cache version must not contain path separators: {version}"),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the downloads directory, resolving defaults if not set.
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.delivery
            .downloads_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| Self::default_data_dir().join("downloads"))
    }

    /// Directory where shared files are staged before the share command runs.
    ///
    /// Lives next to the database.
    #[must_use]
    pub fn share_staging_dir(&self) -> PathBuf {
        self.database_path()
            .parent()
            .map_or_else(Self::default_data_dir, Path::to_path_buf)
            .join("share")
    }

    /// Get the asset cache directory, resolving defaults if not set.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .cache_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("cache"))
    }

    /// Lifetime of a new session.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session.ttl_hours))
    }
}
