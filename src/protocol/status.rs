//! Status decoding.
//!
//! Turns the raw bytes of the status characteristics into a [`StatusSnapshot`].
//! The layout is fixed by the device firmware:
//! - Temperatures: unsigned little-endian integer in hundredths of °C
//!   (two bytes on current firmware)
//! - Battery: byte 0 percent, byte 1 (optional) charging flag
//! - Liquid state: byte 0 state code
//! - Liquid level: byte 0 level

use crate::data::StatusSnapshot;
use crate::error::{Error, Result};
use crate::utils::round_to;

/// Raw characteristic values captured during one BLE session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawStatus {
    /// Current temperature characteristic.
    pub current_temp: Vec<u8>,
    /// Target temperature characteristic.
    pub target_temp: Vec<u8>,
    /// Battery characteristic.
    pub battery: Vec<u8>,
    /// Liquid state characteristic.
    pub liquid_state: Vec<u8>,
    /// Liquid level characteristic.
    pub liquid_level: Vec<u8>,
}

impl RawStatus {
    /// Decode into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] when a temperature value is wider than
    /// four bytes. The session is treated as a whole, so one bad field fails
    /// the entire decode.
    pub fn decode(&self) -> Result<StatusSnapshot> {
        let current_temp_c = decode_temperature(&self.current_temp).map_err(|e| {
            Error::InvalidData {
                context: format!("current temperature: {}", e),
            }
        })?;
        let target_temp_c =
            decode_temperature(&self.target_temp).map_err(|e| Error::InvalidData {
                context: format!("target temperature: {}", e),
            })?;
        let (battery_percent, charging) = decode_battery(&self.battery);

        Ok(StatusSnapshot {
            current_temp_c,
            target_temp_c,
            battery_percent,
            charging,
            liquid_state_code: self.liquid_state.first().copied(),
            liquid_level: self.liquid_level.first().copied(),
        })
    }
}

/// Largest temperature field accepted, in bytes.
const MAX_TEMPERATURE_BYTES: usize = 4;

/// Decode a temperature characteristic.
///
/// Empty data means the value is unreadable and yields `None` rather than
/// `0.0`, so a missing reading is never shown as freezing liquid. Values
/// wider than four bytes are rejected instead of decoded at any width; the
/// firmware sends two, so a longer value means a corrupted read.
pub fn decode_temperature(data: &[u8]) -> std::result::Result<Option<f64>, String> {
    if data.is_empty() {
        return Ok(None);
    }
    if data.len() > MAX_TEMPERATURE_BYTES {
        return Err(format!(
            "{} bytes (at most {} expected)",
            data.len(),
            MAX_TEMPERATURE_BYTES
        ));
    }

    let raw = data
        .iter()
        .rev()
        .fold(0u32, |acc, &byte| (acc << 8) | byte as u32);

    Ok(Some(round_to(raw as f64 * 0.01, 2)))
}

/// Decode the battery characteristic into `(percent, charging)`.
pub fn decode_battery(data: &[u8]) -> (Option<u8>, Option<bool>) {
    (data.first().copied(), data.get(1).map(|&b| b != 0))
}
