//! Status snapshot data structures.
//!
//! A [`StatusSnapshot`] is one complete decoded reading of every device field.
//! Snapshots are immutable: each successful poll produces a new one that
//! replaces the previous one wholesale.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Liquid state reported by the device.
///
/// Codes outside 1..=6 resolve to [`LiquidState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiquidState {
    /// Code 1.
    Empty,
    /// Code 2.
    Filling,
    /// Code 3, and any unrecognised code.
    Unknown,
    /// Code 4.
    Cooling,
    /// Code 5.
    Heating,
    /// Code 6.
    StableTemperature,
}

impl LiquidState {
    /// Create from the raw state code.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Empty,
            2 => Self::Filling,
            4 => Self::Cooling,
            5 => Self::Heating,
            6 => Self::StableTemperature,
            _ => Self::Unknown,
        }
    }

    /// Label used in serialized payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Filling => "filling",
            Self::Unknown => "unknown",
            Self::Cooling => "cooling",
            Self::Heating => "heating",
            Self::StableTemperature => "stable_temperature",
        }
    }
}

impl std::fmt::Display for LiquidState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One complete reading of the device.
///
/// The liquid state label is not stored; it is always derived from
/// `liquid_state_code`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusSnapshot {
    /// Current liquid temperature in °C, two decimals.
    pub current_temp_c: Option<f64>,
    /// Target temperature in °C, two decimals.
    pub target_temp_c: Option<f64>,
    /// Battery charge as reported (0-255).
    pub battery_percent: Option<u8>,
    /// Whether the device sits on its charger.
    pub charging: Option<bool>,
    /// Raw liquid state code.
    pub liquid_state_code: Option<u8>,
    /// Liquid level (0-255).
    pub liquid_level: Option<u8>,
}

impl StatusSnapshot {
    /// Resolved liquid state, absent when no code was read.
    pub fn liquid_state(&self) -> Option<LiquidState> {
        self.liquid_state_code.map(LiquidState::from_code)
    }

    /// Flat field-name → value mapping served to consumers.
    ///
    /// Absent fields are `null`.
    pub fn to_payload(&self) -> Value {
        json!({
            "current_temp_c": self.current_temp_c,
            "target_temp_c": self.target_temp_c,
            "battery_percent": self.battery_percent,
            "charging": self.charging,
            "liquid_state_code": self.liquid_state_code,
            "liquid_state": self.liquid_state().map(|s| s.label()),
            "liquid_level": self.liquid_level,
        })
    }
}

impl Serialize for StatusSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_payload().serialize(serializer)
    }
}
