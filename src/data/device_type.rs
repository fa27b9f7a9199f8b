//! Device kinds.
//!
//! The kind is cosmetic: it selects the model name shown to users and has no
//! effect on polling.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Kind of Ember device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Ember Mug.
    #[default]
    Mug,
    /// Ember Tumbler.
    Tumbler,
}

impl DeviceType {
    /// Human-readable model name.
    pub fn model_name(&self) -> &'static str {
        match self {
            Self::Mug => "Ember Mug",
            Self::Tumbler => "Ember Tumbler",
        }
    }

    /// Configuration key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mug => "mug",
            Self::Tumbler => "tumbler",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mug" => Ok(Self::Mug),
            "tumbler" => Ok(Self::Tumbler),
            other => Err(ConfigError::UnknownDeviceType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_default() {
        assert_eq!(DeviceType::default(), DeviceType::Mug);
    }

    #[test]
    fn test_model_name() {
        assert_eq!(DeviceType::Mug.model_name(), "Ember Mug");
        assert_eq!(DeviceType::Tumbler.model_name(), "Ember Tumbler");
    }

    #[test]
    fn test_parse() {
        assert_eq!("Tumbler".parse::<DeviceType>().unwrap(), DeviceType::Tumbler);
        assert_eq!(" mug ".parse::<DeviceType>().unwrap(), DeviceType::Mug);
        assert!(matches!(
            "cup".parse::<DeviceType>(),
            Err(ConfigError::UnknownDeviceType(_))
        ));
    }
}
