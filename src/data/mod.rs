//! Data structures for device data.
//!
//! This module contains the status snapshot produced by each poll and the
//! device kind used for display.

pub mod device_type;
pub mod status;

pub use device_type::DeviceType;
pub use status::{LiquidState, StatusSnapshot};
