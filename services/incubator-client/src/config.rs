//! Configuration types for the incubator client

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{IncubatorError, Result};

/// Incubator client configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Incubator controller connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// IP address or host name of the ESP32 controller
    #[serde(default = "default_host")]
    pub host: String,
    /// WebSocket port served by the firmware
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl DeviceConfig {
    /// WebSocket URL of the controller, e.g. `ws://192.168.1.8:81/`
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        // IPv6 literals need brackets in the authority
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("ws://{}:{}{}", host, self.port, path)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(IncubatorError::InvalidConfig(
                "host must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(IncubatorError::InvalidConfig(
                "port must be non-zero".to_string(),
            ));
        }
        if self.connection_timeout_seconds == 0 {
            return Err(IncubatorError::InvalidConfig(
                "connection_timeout_seconds must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            connection_timeout_seconds: default_connection_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

fn default_host() -> String {
    "192.168.1.8".to_string()
}

fn default_port() -> u16 {
    81
}

fn default_path() -> String {
    "/".to_string()
}

fn default_connection_timeout() -> u64 {
    10
}

/// Configuration for automatic reconnection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect when the connection closes
    #[serde(default = "default_reconnect_enabled")]
    pub enabled: bool,
    /// Fixed delay between a close and the next attempt, in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub delay_ms: u64,
    /// Maximum number of consecutive failed attempts (None for unlimited)
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconnect_enabled(),
            delay_ms: default_reconnect_delay(),
            max_retries: None,
        }
    }
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_reconnect_delay() -> u64 {
    3000
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.device.validate()?;
    Ok(config)
}
