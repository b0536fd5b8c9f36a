//! # Configuration Management Module
//!
//! Centralized configuration for the link engine: which serial port to use,
//! how long to wait for replies, and how chatty the logs should be.
//!
//! ## Configuration File Format
//!
//! TOML, human readable:
//!
//! ```toml
//! [device]
//! port = "/dev/ttyS0"
//! baud_rate = 19200
//!
//! [protocol]
//! reply_timeout_ms = 4000
//! edit_timeout_ms = 3000
//! ack_timeout_ms = 4000
//! command_retries = 0
//!
//! [logging]
//! level = "info"
//! ```
//!
//! All values have defaults; an empty file is a valid configuration apart
//! from the device port. Values are validated on load.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Request correlation tuning. The defaults match the waits the phones were
/// originally driven with: 4 s for command replies, 3 s for the edit-mode
/// prompt, 4 s for chunk acknowledgements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    #[serde(default = "default_edit_timeout_ms")]
    pub edit_timeout_ms: u64,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// How many times a timed-out command send is reissued before giving up.
    /// Definitive rejections (ERROR, +CMS ERROR) are never retried.
    #[serde(default)]
    pub command_retries: u32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_baud_rate() -> u32 {
    19200
}
fn default_reply_timeout_ms() -> u64 {
    4000
}
fn default_edit_timeout_ms() -> u64 {
    3000
}
fn default_ack_timeout_ms() -> u64 {
    4000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            port: "/dev/ttyS0".to_string(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            reply_timeout_ms: default_reply_timeout_ms(),
            edit_timeout_ms: default_edit_timeout_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            command_retries: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: DeviceConfig::default(),
            protocol: ProtocolConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ProtocolConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn edit_timeout(&self) -> Duration {
        Duration::from_millis(self.edit_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.device.port.is_empty() {
            return Err(anyhow!("device.port must not be empty"));
        }
        if self.device.baud_rate == 0 {
            return Err(anyhow!("device.baud_rate must be non-zero"));
        }
        if self.protocol.reply_timeout_ms == 0
            || self.protocol.edit_timeout_ms == 0
            || self.protocol.ack_timeout_ms == 0
        {
            return Err(anyhow!("protocol timeouts must be non-zero"));
        }
        Ok(())
    }
}
