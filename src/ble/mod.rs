//! BLE communication module.
//!
//! This module provides the Bluetooth Low Energy plumbing for finding Ember
//! devices and reading their status characteristics.

pub mod characteristics;
pub mod connection;
pub mod reader;
pub mod scanner;
pub mod uuids;

pub use characteristics::CharacteristicHandler;
pub use connection::{ConnectionManager, ConnectionState};
pub use reader::{BleDeviceReader, DeviceReader};
pub use scanner::{BleScanner, DiscoveredDevice};
pub use uuids::*;
