// Configuration management module
// TOML-backed settings for the record store location and pool sizing


use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// File name of the SQLite record store inside the base directory.
    pub database_file: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "records.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid database file name: {0} (cannot be empty or a path)")]
    InvalidDatabaseFile(String),
    #[error("Invalid max connections: {0} (must be between 1 and 64)")]
    InvalidMaxConnections(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory under the platform config root.
    #[inline]
    pub fn default_dir() -> std::result::Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir()
            .ok_or(ConfigError::DirectoryError)?
            .join("knowledge-sync");
        Ok(dir)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                storage: StorageConfig::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .map_err(|e| crate::KnowledgeError::Config(e.to_string()))?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .map_err(|e| crate::KnowledgeError::Config(e.to_string()))?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.storage.validate()
    }

    /// Path of the SQLite record store.
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join(&self.storage.database_file)
    }
}

impl StorageConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.database_file.trim().is_empty()
            || self.database_file.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(ConfigError::InvalidDatabaseFile(self.database_file.clone()));
        }

        if self.max_connections == 0 || self.max_connections > 64 {
            return Err(ConfigError::InvalidMaxConnections(self.max_connections));
        }

        Ok(())
    }
}
