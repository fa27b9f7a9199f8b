//! BLE scanning functionality.
//!
//! Provides adapter access, lookup of a configured device by address and
//! discovery of nearby Ember devices.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use std::time::Duration;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::ble::uuids::is_ember_service;
use crate::error::{Error, Result};

/// A nearby device that looks like an Ember.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Address used to configure the device.
    pub address: String,
    /// Display label, `"<name> (<address>)"`.
    pub label: String,
}

/// BLE scanner bound to one adapter.
#[derive(Clone)]
pub struct BleScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
}

impl BleScanner {
    /// Create a new BLE scanner on the first available adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Create a new BLE scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Find the peripheral with the given address, scanning for at most
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if nothing matched in time.
    pub async fn find_peripheral(&self, address: &str, timeout: Duration) -> Result<Peripheral> {
        if let Some(peripheral) = self.known_peripheral(address).await? {
            return Ok(peripheral);
        }

        debug!("Scanning for {} (up to {:?})", address, timeout);

        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let found = loop {
            tokio::select! {
                Some(event) = events.next() => {
                    let id = match event {
                        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                        _ => continue,
                    };
                    trace!("Device seen: {:?}", id);
                    let Ok(peripheral) = self.adapter.peripheral(&id).await else {
                        continue;
                    };
                    if peripheral_matches(&peripheral, address) {
                        break Some(peripheral);
                    }
                }
                _ = &mut deadline => break None,
            }
        };

        if let Err(e) = self.adapter.stop_scan().await {
            debug!("Failed to stop scan: {}", e);
        }

        found.ok_or_else(|| Error::DeviceNotFound {
            address: address.to_string(),
        })
    }

    /// Scan for `timeout` and return every device that looks like an Ember,
    /// sorted by label.
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        info!("Scanning for Ember devices for {:?}", timeout);

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;
        tokio::time::sleep(timeout).await;
        self.adapter.stop_scan().await.map_err(Error::Bluetooth)?;

        let mut found = Vec::new();
        for peripheral in self.adapter.peripherals().await.map_err(Error::Bluetooth)? {
            let Ok(Some(properties)) = peripheral.properties().await else {
                continue;
            };
            let name = properties.local_name.as_deref();
            if !looks_like_ember(name, &properties.services) {
                continue;
            }
            let address = properties.address.to_string();
            found.push(DiscoveredDevice {
                label: device_label(name, &address),
                address,
            });
        }

        sort_by_label(&mut found);
        debug!("Discovered {} Ember devices", found.len());

        Ok(found)
    }

    async fn known_peripheral(&self, address: &str) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await.map_err(Error::Bluetooth)? {
            if peripheral_matches(&peripheral, address) {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }
}

/// Match on the BD address, or on the platform id where addresses are hidden
/// (macOS reports UUID identifiers).
fn peripheral_matches(peripheral: &Peripheral, address: &str) -> bool {
    if peripheral.address().to_string().eq_ignore_ascii_case(address) {
        return true;
    }
    peripheral.id().to_string().eq_ignore_ascii_case(address)
}

/// Whether an advertisement looks like an Ember device.
pub fn looks_like_ember(name: Option<&str>, services: &[Uuid]) -> bool {
    let by_name = name
        .map(|n| n.to_lowercase().contains("ember"))
        .unwrap_or(false);
    by_name || services.iter().any(is_ember_service)
}

/// Display label for a discovered device.
pub fn device_label(name: Option<&str>, address: &str) -> String {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    format!("{} ({})", name.unwrap_or("Ember device"), address)
}

fn sort_by_label(devices: &mut [DiscoveredDevice]) {
    devices.sort_by_key(|d| d.label.to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuids::{CURRENT_TEMP_UUID, EMBER_SERVICE_UUID};

    #[test]
    fn test_looks_like_ember_by_name() {
        assert!(looks_like_ember(Some("Ember Ceramic Mug"), &[]));
        assert!(looks_like_ember(Some("EMBER"), &[]));
        assert!(!looks_like_ember(Some("Thermometer"), &[]));
        assert!(!looks_like_ember(None, &[]));
    }

    #[test]
    fn test_looks_like_ember_by_service() {
        assert!(looks_like_ember(None, &[EMBER_SERVICE_UUID]));
        assert!(!looks_like_ember(None, &[CURRENT_TEMP_UUID]));
    }

    #[test]
    fn test_device_label() {
        assert_eq!(
            device_label(Some(" Ember Mug 2 "), "C8:2E:47:00:11:22"),
            "Ember Mug 2 (C8:2E:47:00:11:22)"
        );
        assert_eq!(
            device_label(None, "C8:2E:47:00:11:22"),
            "Ember device (C8:2E:47:00:11:22)"
        );
        assert_eq!(device_label(Some(""), "AA"), "Ember device (AA)");
    }

    #[test]
    fn test_sort_by_label_ignores_case() {
        let mut devices = vec![
            DiscoveredDevice {
                address: "2".to_string(),
                label: "ember tumbler (2)".to_string(),
            },
            DiscoveredDevice {
                address: "1".to_string(),
                label: "Ember Mug (1)".to_string(),
            },
        ];
        sort_by_label(&mut devices);
        assert_eq!(devices[0].address, "1");
        assert_eq!(devices[1].address, "2");
    }
}
