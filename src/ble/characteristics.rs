//! GATT characteristic handling.
//!
//! Provides functionality for reading the status characteristics of a
//! connected Ember device.

use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::uuids::*;
use crate::error::{Error, Result};
use crate::protocol::RawStatus;

/// Handler for GATT characteristics on a device.
pub struct CharacteristicHandler {
    /// The peripheral to communicate with.
    peripheral: Peripheral,
    /// Cached characteristics by UUID.
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
}

impl CharacteristicHandler {
    /// Create a new characteristic handler for a peripheral.
    ///
    /// Note: Services must be discovered before using this handler.
    pub fn new(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            characteristics: RwLock::new(HashMap::new()),
        }
    }

    /// Discover and cache all characteristics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceNotFound`] if the Ember service is missing.
    pub fn discover_characteristics(&self) -> Result<()> {
        let services = self.peripheral.services();

        if !services.iter().any(|s| is_ember_service(&s.uuid)) {
            return Err(Error::ServiceNotFound {
                uuid: EMBER_SERVICE_UUID.to_string(),
            });
        }

        let mut chars = self.characteristics.write();
        chars.clear();

        for service in services {
            for characteristic in service.characteristics {
                trace!(
                    "Found characteristic: {} in service {}",
                    characteristic.uuid,
                    service.uuid
                );
                chars.insert(characteristic.uuid, characteristic);
            }
        }

        debug!("Discovered {} characteristics", chars.len());

        Ok(())
    }

    /// Check if a characteristic exists.
    pub fn has_characteristic(&self, uuid: &Uuid) -> bool {
        self.characteristics.read().contains_key(uuid)
    }

    /// Read a characteristic value.
    pub async fn read(&self, uuid: &Uuid) -> Result<Vec<u8>> {
        let characteristic = self
            .characteristics
            .read()
            .get(uuid)
            .cloned()
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
            })?;

        let data = self
            .peripheral
            .read(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        trace!("Read {} bytes from characteristic {}", data.len(), uuid);

        Ok(data)
    }

    /// Read every status characteristic.
    ///
    /// Any single failure aborts the whole read.
    pub async fn read_status(&self) -> Result<RawStatus> {
        Ok(RawStatus {
            current_temp: self.read(&CURRENT_TEMP_UUID).await?,
            target_temp: self.read(&TARGET_TEMP_UUID).await?,
            battery: self.read(&BATTERY_UUID).await?,
            liquid_state: self.read(&LIQUID_STATE_UUID).await?,
            liquid_level: self.read(&LIQUID_LEVEL_UUID).await?,
        })
    }
}
