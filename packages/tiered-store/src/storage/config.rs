// Storage configuration management
use crate::error::{StorageError, StorageResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Environment variable overriding the storage root
pub const ROOT_ENV: &str = "TSTORE_ROOT";

/// Option name for the storage root in generic option maps
pub const ROOT_OPTION: &str = "root";

/// Filesystem storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Existing, writable directory all objects live under
    pub root: PathBuf,
}

impl StorageConfig {
    /// Configuration rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Build from a generic option map
    ///
    /// `root` is required. Unrecognized options are ignored with a warning.
    pub fn from_options(options: &HashMap<String, String>) -> StorageResult<Self> {
        for name in options.keys().filter(|name| name.as_str() != ROOT_OPTION) {
            tracing::warn!(option = %name, "Ignoring unrecognized storage option");
        }

        let root = options
            .get(ROOT_OPTION)
            .filter(|root| !root.is_empty())
            .ok_or_else(|| {
                StorageError::InvalidConfiguration(format!("{} option is required", ROOT_OPTION))
            })?;

        Ok(Self::new(root))
    }

    /// Load configuration with the following priority:
    /// 1. TSTORE_ROOT environment variable
    /// 2. config.toml file
    /// 3. Default: platform data directory
    pub async fn load() -> Result<Self> {
        if let Ok(env_path) = std::env::var(ROOT_ENV) {
            return Ok(Self::new(env_path));
        }

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                return Self::from_file(&config_path).await;
            }
        }

        Ok(Self::default())
    }

    /// Parse a TOML configuration file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the config file path (~/.config/tstore/config.toml)
    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tstore").join("config.toml"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tstore");

        Self { root }
    }
}
