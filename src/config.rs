//! Configuration loading and validation.
//!
//! Configuration is read from a TOML file; every section is optional except
//! the device address:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8080"
//!
//! [device]
//! address = "C8:2E:47:00:11:22"
//! scan_interval = 15
//! device_type = "mug"
//!
//! [ble]
//! lookup_timeout = 10
//! discovery_timeout = 5
//! ```

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::data::DeviceType;
use crate::error::ConfigError;

/// Default poll interval in seconds.
pub const DEFAULT_SCAN_INTERVAL: u64 = 15;
/// Smallest accepted poll interval in seconds.
pub const MIN_SCAN_INTERVAL: u64 = 5;
/// Largest accepted poll interval in seconds.
pub const MAX_SCAN_INTERVAL: u64 = 300;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// The polled device.
    pub device: DeviceConfig,
    /// Bluetooth transport settings.
    pub ble: BleConfig,
}

impl Config {
    /// Load from a TOML file. The result is not validated yet; apply
    /// overrides first, then call [`Config::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        info!("Loading config from: {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device.validate()?;
        self.server.bind_addr()?;
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))
    }
}

/// Settings of the polled device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Bluetooth address (or platform identifier) of the device.
    pub address: String,
    /// Seconds between polls.
    pub scan_interval: u64,
    /// Kind of device, cosmetic.
    pub device_type: DeviceType,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            device_type: DeviceType::default(),
        }
    }
}

impl DeviceConfig {
    /// Settings for `address` with default interval and type.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the poll interval in seconds.
    pub fn with_scan_interval(mut self, seconds: u64) -> Self {
        self.scan_interval = seconds;
        self
    }

    /// Set the device type.
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Check the address and interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        validate_interval(self.scan_interval)?;
        Ok(())
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }
}

/// Check a poll interval against the accepted range.
pub fn validate_interval(seconds: u64) -> Result<Duration, ConfigError> {
    if !(MIN_SCAN_INTERVAL..=MAX_SCAN_INTERVAL).contains(&seconds) {
        return Err(ConfigError::IntervalOutOfRange {
            value: seconds,
            min: MIN_SCAN_INTERVAL,
            max: MAX_SCAN_INTERVAL,
        });
    }
    Ok(Duration::from_secs(seconds))
}

/// Bluetooth transport settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Seconds to scan for the configured device on each poll.
    pub lookup_timeout: u64,
    /// Seconds to scan during discovery.
    pub discovery_timeout: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: 10,
            discovery_timeout: 5,
        }
    }
}

impl BleConfig {
    /// Lookup timeout as a duration.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout)
    }

    /// Discovery timeout as a duration.
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout)
    }
}
