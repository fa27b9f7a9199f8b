// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # ember-mug-ble
//!
//! Polls an Ember smart mug (or tumbler) over Bluetooth Low Energy, keeps the
//! latest status, and fans every new reading out to any number of live
//! subscribers.
//!
//! ## Features
//!
//! - **Periodic polling**: one BLE session per tick, at most one at a time
//! - **Last-known-good cache**: failed polls never clear or corrupt it
//! - **Live fan-out**: every subscriber owns a single-slot mailbox that keeps
//!   only the newest status; slow consumers never hold up the poll loop
//! - **HTTP surface**: JSON snapshot, Server-Sent Events stream, health and a
//!   small live page
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ember_mug_ble::{BleDeviceReader, Coordinator, DeviceConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let reader = BleDeviceReader::new().await?;
//!     let config = DeviceConfig::new("C8:2E:47:00:11:22").with_scan_interval(15);
//!     let coordinator = Coordinator::start(config, Arc::new(reader)).await?;
//!
//!     let subscription = coordinator.subscribe();
//!     while let Some(status) = subscription.recv().await {
//!         println!("{}", status);
//!     }
//!
//!     coordinator.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Devices are identified by a platform UUID
//! rather than a MAC address.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.

// Public modules
pub mod ble;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod protocol;
pub mod server;
pub mod utils;

// Re-exports for convenience
pub use config::{Config, DeviceConfig};
pub use coordinator::{
    Coordinator, Mailbox, Payload, PollHealth, PollOptions, SubscriberRegistry, Subscription,
};
pub use error::{ConfigError, Error, Result};
pub use utils::{celsius_to_fahrenheit, round_to};

// Re-export commonly used types from submodules
pub use ble::connection::ConnectionState;
pub use ble::reader::{BleDeviceReader, DeviceReader};
pub use data::{DeviceType, LiquidState, StatusSnapshot};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        let _ = std::any::TypeId::of::<Coordinator>();
        let _ = std::any::TypeId::of::<SubscriberRegistry>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<StatusSnapshot>();
        let _ = std::any::TypeId::of::<PollHealth>();
        let _ = std::any::TypeId::of::<BleDeviceReader>();
    }

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert_eq!(round_to(18.014, 2), 18.01);
    }
}
