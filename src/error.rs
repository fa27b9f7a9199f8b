//! Error types for the ember-mug-ble crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No peripheral with the configured address showed up while scanning.
    #[error("Device not found: {address}")]
    DeviceNotFound {
        /// The address that was searched for.
        address: String,
    },

    /// Failed to establish a connection to the device.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// Invalid data was received from the device.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// The configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O failure outside the BLE stack (listener, socket).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from talking to the device.
    ///
    /// Device errors are recovered by the poll loop: the cached status is kept
    /// and polling continues at the next tick.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::Bluetooth(_)
                | Self::BluetoothUnavailable
                | Self::DeviceNotFound { .. }
                | Self::ConnectionFailed { .. }
                | Self::InvalidData { .. }
                | Self::CharacteristicNotFound { .. }
                | Self::ServiceNotFound { .. }
        )
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No device address was configured.
    #[error("A device address is required")]
    MissingAddress,

    /// The poll interval is outside the accepted range.
    #[error("Poll interval {value}s is out of range ({min}..={max})")]
    IntervalOutOfRange {
        /// The rejected interval in seconds.
        value: u64,
        /// Smallest accepted interval.
        min: u64,
        /// Largest accepted interval.
        max: u64,
    },

    /// The device type is not one of the known kinds.
    #[error("Unknown device type: {0}")]
    UnknownDeviceType(String),

    /// The server bind address could not be parsed.
    #[error("Invalid bind address: {0}")]
    InvalidBind(String),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_classification() {
        assert!(Error::BluetoothUnavailable.is_device_error());
        assert!(Error::DeviceNotFound {
            address: "AA:BB".to_string()
        }
        .is_device_error());
        assert!(Error::InvalidData {
            context: "short".to_string()
        }
        .is_device_error());
        assert!(!Error::Config(ConfigError::MissingAddress).is_device_error());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::IntervalOutOfRange {
            value: 1,
            min: 5,
            max: 300,
        };
        assert_eq!(err.to_string(), "Poll interval 1s is out of range (5..=300)");
    }
}
