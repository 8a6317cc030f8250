//! BLE Service and Characteristic UUIDs.
//!
//! Contains all UUID constants used for hygrometer sensor communication.

use uuid::Uuid;

// Device Information Service (Standard BLE)
/// Standard BLE Device Information Service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180a_0000_1000_8000_00805f9b34fb);
/// Firmware Revision String characteristic UUID.
pub const FIRMWARE_REVISION_UUID: Uuid = Uuid::from_u128(0x0000_2a26_0000_1000_8000_00805f9b34fb);

// Battery Service (Standard BLE)
//
// The sensor advertises this service but does not answer reads on it with
// current firmware, so the battery flow stays inactive.
/// Standard BLE Battery Service UUID.
pub const BATTERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180f_0000_1000_8000_00805f9b34fb);
/// Battery Level characteristic UUID.
pub const BATTERY_LEVEL_UUID: Uuid = Uuid::from_u128(0x0000_2a19_0000_1000_8000_00805f9b34fb);

// Proprietary data service
/// Sensor data service UUID.
pub const DATA_SERVICE_UUID: Uuid = Uuid::from_u128(0x226c_0000_6476_4566_7562_66734470666d);
/// Temperature & humidity characteristic UUID (Notify).
pub const TEMP_HUMIDITY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x226c_aa55_6476_4566_7562_66734470666d);
/// Auxiliary message characteristic UUID (unused by this driver).
pub const MESSAGE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x226c_bb55_6476_4566_7562_66734470666d);

// Descriptors
/// Standard Client Characteristic Configuration descriptor UUID.
pub const CCC_DESCRIPTOR_UUID: Uuid = Uuid::from_u128(0x0000_2902_0000_1000_8000_00805f9b34fb);

/// CCC descriptor value that enables notifications.
pub const NOTIFY_ENABLE: [u8; 2] = [0x01, 0x00];
/// CCC descriptor value that disables notifications.
pub const NOTIFY_DISABLE: [u8; 2] = [0x00, 0x00];

/// Check if a service UUID is the sensor's proprietary data service.
pub fn is_sensor_data_service(uuid: &Uuid) -> bool {
    *uuid == DATA_SERVICE_UUID
}

/// Check if a service UUID is one the driver knows how to handle.
pub fn is_known_service(uuid: &Uuid) -> bool {
    *uuid == DEVICE_INFO_SERVICE_UUID || *uuid == BATTERY_SERVICE_UUID || *uuid == DATA_SERVICE_UUID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        // Verify UUIDs are properly formatted
        let device_info = DEVICE_INFO_SERVICE_UUID.to_string();
        assert!(device_info.contains("180a"));

        let data = DATA_SERVICE_UUID.to_string();
        assert!(data.starts_with("226c0000"));

        let temp_humidity = TEMP_HUMIDITY_CHARACTERISTIC_UUID.to_string();
        assert!(temp_humidity.starts_with("226caa55"));
    }

    #[test]
    fn test_is_sensor_data_service() {
        assert!(is_sensor_data_service(&DATA_SERVICE_UUID));
        assert!(!is_sensor_data_service(&DEVICE_INFO_SERVICE_UUID));
        assert!(!is_sensor_data_service(&TEMP_HUMIDITY_CHARACTERISTIC_UUID));
    }

    #[test]
    fn test_is_known_service() {
        assert!(is_known_service(&DEVICE_INFO_SERVICE_UUID));
        assert!(is_known_service(&BATTERY_SERVICE_UUID));
        assert!(is_known_service(&DATA_SERVICE_UUID));
        assert!(!is_known_service(&FIRMWARE_REVISION_UUID));
    }

    #[test]
    fn test_descriptor_values() {
        assert_eq!(NOTIFY_ENABLE, [0x01, 0x00]);
        assert_eq!(NOTIFY_DISABLE, [0x00, 0x00]);
        assert_ne!(NOTIFY_ENABLE, NOTIFY_DISABLE);
    }
}
