//! Configuration file types

use serde::{Deserialize, Serialize};

use super::storage::StorageError;

/// Current configuration format version
pub const CONFIG_VERSION: u32 = 1;

/// Authentication gate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Simulated backend round trip for a login submission
    pub login_delay_ms: u64,
    /// VPN command-line tool probed on the login screen
    pub cli_program: String,
    /// Where the login screen points users when the tool is missing
    pub cli_download_url: String,
    /// A probe that has not answered by then counts as "not installed"
    pub probe_timeout_ms: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            login_delay_ms: 1500,
            cli_program: "nordvpn".to_string(),
            cli_download_url: "https://nordvpn.com/download/linux/".to_string(),
            probe_timeout_ms: 5000,
        }
    }
}

/// Telemetry simulation settings (rates in MB/s)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub interval_ms: u64,
    pub download_min: f64,
    pub download_max: f64,
    pub upload_min: f64,
    pub upload_max: f64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            download_min: 10.0,
            download_max: 60.0,
            upload_min: 5.0,
            upload_max: 25.0,
        }
    }
}

/// Local API server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8888,
        }
    }
}

/// Root configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub auth: AuthSettings,
    pub telemetry: TelemetrySettings,
    pub api: ApiSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            auth: AuthSettings::default(),
            telemetry: TelemetrySettings::default(),
            api: ApiSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), StorageError> {
        let t = &self.telemetry;
        if t.interval_ms == 0 {
            return Err(StorageError::Invalid(
                "telemetry.interval_ms must be greater than zero".to_string(),
            ));
        }
        check_range("download", t.download_min, t.download_max)?;
        check_range("upload", t.upload_min, t.upload_max)?;

        if self.auth.probe_timeout_ms == 0 {
            return Err(StorageError::Invalid(
                "auth.probe_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.auth.cli_program.trim().is_empty() {
            return Err(StorageError::Invalid(
                "auth.cli_program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), StorageError> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 || min >= max {
        return Err(StorageError::Invalid(format!(
            "telemetry.{name}_min/{name}_max must satisfy 0 <= min < max (got {min}..{max})"
        )));
    }
    Ok(())
}
