//! Protocol module for decoding device data.
//!
//! This module contains the byte layout of the status characteristics and
//! the decoding into [`crate::data::StatusSnapshot`].

pub mod status;

pub use status::{decode_battery, decode_temperature, RawStatus};
