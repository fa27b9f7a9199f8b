//! BLE Service and Characteristic UUIDs.
//!
//! Contains all UUID constants used for Ember device communication.

use uuid::Uuid;

/// Ember primary service UUID, also advertised by the device.
pub const EMBER_SERVICE_UUID: Uuid = Uuid::from_u128(0xfc543622_236c_4c94_8fa9_944a3e5353fa);

/// Current liquid temperature (u16 little-endian, hundredths of °C).
pub const CURRENT_TEMP_UUID: Uuid = Uuid::from_u128(0xfc540002_236c_4c94_8fa9_944a3e5353fa);
/// Target temperature (u16 little-endian, hundredths of °C).
pub const TARGET_TEMP_UUID: Uuid = Uuid::from_u128(0xfc540003_236c_4c94_8fa9_944a3e5353fa);
/// Liquid level (first byte).
pub const LIQUID_LEVEL_UUID: Uuid = Uuid::from_u128(0xfc540005_236c_4c94_8fa9_944a3e5353fa);
/// Battery percent and charging flag.
pub const BATTERY_UUID: Uuid = Uuid::from_u128(0xfc540007_236c_4c94_8fa9_944a3e5353fa);
/// Liquid state code (first byte).
pub const LIQUID_STATE_UUID: Uuid = Uuid::from_u128(0xfc540008_236c_4c94_8fa9_944a3e5353fa);
/// Push events characteristic (Notify). Not subscribed to; status is polled.
pub const PUSH_EVENTS_UUID: Uuid = Uuid::from_u128(0xfc540012_236c_4c94_8fa9_944a3e5353fa);

/// Characteristics read during one status poll, in read order.
pub const STATUS_CHARACTERISTICS: [Uuid; 5] = [
    CURRENT_TEMP_UUID,
    TARGET_TEMP_UUID,
    BATTERY_UUID,
    LIQUID_STATE_UUID,
    LIQUID_LEVEL_UUID,
];

/// Check if a service UUID is the Ember service.
pub fn is_ember_service(uuid: &Uuid) -> bool {
    *uuid == EMBER_SERVICE_UUID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            EMBER_SERVICE_UUID.to_string(),
            "fc543622-236c-4c94-8fa9-944a3e5353fa"
        );
        assert_eq!(
            CURRENT_TEMP_UUID.to_string(),
            "fc540002-236c-4c94-8fa9-944a3e5353fa"
        );
        assert_eq!(
            LIQUID_STATE_UUID.to_string(),
            "fc540008-236c-4c94-8fa9-944a3e5353fa"
        );
    }

    #[test]
    fn test_is_ember_service() {
        assert!(is_ember_service(&EMBER_SERVICE_UUID));
        assert!(!is_ember_service(&CURRENT_TEMP_UUID));
    }

    #[test]
    fn test_status_characteristics_exclude_push_events() {
        assert!(!STATUS_CHARACTERISTICS.contains(&PUSH_EVENTS_UUID));
        assert_eq!(STATUS_CHARACTERISTICS.len(), 5);
    }
}
