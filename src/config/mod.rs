//! Configuration management for Strata

pub mod schema;

pub use schema::Config;

use crate::error::{StrataError, StrataResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Environment override for the state directory, used by tests and CI
pub const STATE_DIR_ENV: &str = "STRATA_STATE_DIR";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strata")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strata")
    }

    /// Get the ledger file path
    pub fn ledger_path() -> PathBuf {
        Self::state_dir().join("ledger.json")
    }

    /// Get the directory for rendered build contexts
    pub fn builds_dir() -> PathBuf {
        Self::state_dir().join("builds")
    }

    /// Load configuration, falling back to defaults if no file exists
    pub async fn load(&self) -> StrataResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            StrataError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;

        toml::from_str(&content).map_err(|e| StrataError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Ensure all state directories exist
    pub async fn ensure_state_dirs() -> StrataResult<()> {
        for dir in [Self::state_dir(), Self::builds_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| StrataError::io(format!("creating directory {}", dir.display()), e))?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
