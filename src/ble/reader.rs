//! Device reading.
//!
//! [`DeviceReader`] is the capability the coordinator polls through. The
//! btleplug implementation runs one full BLE session per call: look up the
//! peripheral, connect, read every status characteristic, disconnect. Any
//! failure along the way fails the whole read.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ble::characteristics::CharacteristicHandler;
use crate::ble::connection::ConnectionManager;
use crate::ble::scanner::BleScanner;
use crate::ble::uuids::STATUS_CHARACTERISTICS;
use crate::data::StatusSnapshot;
use crate::error::{Error, Result};

/// Reads one complete status snapshot from a device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceReader: Send + Sync {
    /// Perform one read session against the device at `address`.
    async fn read(&self, address: &str) -> Result<StatusSnapshot>;
}

/// [`DeviceReader`] backed by the platform Bluetooth adapter.
pub struct BleDeviceReader {
    scanner: BleScanner,
    lookup_timeout: Duration,
}

impl BleDeviceReader {
    /// Default time spent scanning for the peripheral before giving up.
    pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a reader on the first available adapter.
    pub async fn new() -> Result<Self> {
        Ok(Self::with_scanner(BleScanner::new().await?))
    }

    /// Create a reader using an existing scanner.
    pub fn with_scanner(scanner: BleScanner) -> Self {
        Self {
            scanner,
            lookup_timeout: Self::DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Set how long to scan for the peripheral on each read.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    async fn read_connected(connection: &ConnectionManager) -> Result<StatusSnapshot> {
        let handler = CharacteristicHandler::new(connection.peripheral().clone());
        handler.discover_characteristics()?;

        if let Some(missing) = STATUS_CHARACTERISTICS
            .iter()
            .find(|uuid| !handler.has_characteristic(uuid))
        {
            return Err(Error::CharacteristicNotFound {
                uuid: missing.to_string(),
            });
        }

        let raw = handler.read_status().await?;
        debug!("Raw status: {:02X?}", raw);
        raw.decode()
    }
}

#[async_trait]
impl DeviceReader for BleDeviceReader {
    async fn read(&self, address: &str) -> Result<StatusSnapshot> {
        let peripheral = self
            .scanner
            .find_peripheral(address, self.lookup_timeout)
            .await?;

        let connection = ConnectionManager::new(peripheral);
        connection.connect().await?;

        let result = Self::read_connected(&connection).await;

        if let Err(e) = connection.disconnect().await {
            warn!("Error disconnecting from {}: {}", address, e);
        }

        result
    }
}
