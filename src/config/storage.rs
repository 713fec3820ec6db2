//! Configuration Storage
//!
//! Reads the configuration file from disk.
//! Config location: ~/.securevpn on macOS/Linux, %APPDATA%\SecureVPN on Windows

use std::path::PathBuf;
use tokio::fs;

use super::types::{AppConfig, CONFIG_VERSION};

/// Configuration storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config version {found} is newer than supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Get the SecureVPN configuration directory
/// Returns %APPDATA%\SecureVPN on Windows, ~/.securevpn on macOS/Linux
pub fn config_dir() -> Result<PathBuf, StorageError> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("SecureVPN"));
        }
        dirs::home_dir()
            .map(|home| home.join(".securevpn"))
            .ok_or(StorageError::NoConfigDir)
    }

    #[cfg(not(windows))]
    {
        dirs::home_dir()
            .map(|home| home.join(".securevpn"))
            .ok_or(StorageError::NoConfigDir)
    }
}

/// Get the config file path
pub fn config_file() -> Result<PathBuf, StorageError> {
    Ok(config_dir()?.join("config.json"))
}

/// Configuration storage manager
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Create a new storage manager with default path
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            path: config_file()?,
        })
    }

    /// Create storage manager with custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load configuration from disk.
    ///
    /// Returns the default config if the file doesn't exist. A corrupted file
    /// is backed up and replaced by defaults in memory; the file itself is
    /// left for the user to inspect.
    pub async fn load(&self) -> Result<AppConfig, StorageError> {
        let config = match fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    if config.version > CONFIG_VERSION {
                        return Err(StorageError::VersionTooNew {
                            found: config.version,
                            supported: CONFIG_VERSION,
                        });
                    }
                    config
                }
                Err(e) => {
                    tracing::warn!("Config file corrupted: {}", e);
                    match self.backup().await {
                        Ok(backup_path) => tracing::warn!(
                            "Corrupted config backed up to {:?}, using defaults",
                            backup_path
                        ),
                        Err(backup_err) => {
                            tracing::error!("Failed to backup corrupted config: {}", backup_err)
                        }
                    }
                    AppConfig::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {:?}, using defaults", self.path);
                AppConfig::default()
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if config file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Get config file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create a backup of the current config
    pub async fn backup(&self) -> Result<PathBuf, StorageError> {
        let backup_path = self.path.with_extension(format!(
            "json.backup.{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ));

        if self.exists().await {
            fs::copy(&self.path, &backup_path).await?;
        }

        Ok(backup_path)
    }
}
