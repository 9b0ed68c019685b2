//! Configuration management for mdt.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::DEFAULT_STORAGE_KEY;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "mdt";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "mdt.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `MDT_`)
/// 2. TOML config file at `~/.config/mdt/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Record defaults.
    pub records: RecordsConfig,
}

/// Which persistence medium holds the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// `SQLite` key-value table.
    #[default]
    Sqlite,
    /// One JSON file per key.
    File,
    /// Process memory; nothing survives exit.
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Persistence medium.
    pub backend: BackendKind,
    /// Database file (sqlite) or directory (file).
    /// Defaults to `~/.local/share/mdt/mdt.db` or `~/.local/share/mdt`.
    pub path: Option<PathBuf>,
    /// Storage key the document is kept under.
    pub key: String,
}

/// Record-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Agency stamped on new records when none is given.
    pub default_agency: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: None, // Resolved per backend at runtime
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            default_agency: "police".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `MDT_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("MDT_").split("__"));

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
        let key = &self.storage.key;
        if key.is_empty() {
            return Err(Error::ConfigValidation {
                message: "storage.key cannot be empty".to_string(),
            });
        }

        // The file backend uses the key as a file name.
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "storage.key '{key}' may only contain ASCII letters, digits, '-', '_' and '.'"
                ),
            });
        }

        if self.records.default_agency.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "records.default_agency cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the storage path for the configured backend, resolving defaults if not set.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(|| {
            let dir = Self::default_data_dir();
            match self.storage.backend {
                BackendKind::Sqlite => dir.join(DATABASE_FILE_NAME),
                BackendKind::File | BackendKind::Memory => dir,
            }
        })
    }
}
