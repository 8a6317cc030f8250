// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # hygrotemp-ble
//!
//! A cross-platform Rust library for reading LCD hygrometer/thermometer
//! sensors via Bluetooth Low Energy.
//!
//! The driver performs one read-and-disconnect cycle per refresh request:
//! it resolves the sensor's services, reads the firmware revision, enables
//! notifications on the temperature & humidity characteristic, decodes one
//! reading, persists it through a pluggable storage collaborator and
//! disconnects.
//!
//! ## Features
//!
//! - **Sensor Discovery**: Automatically discover nearby sensors
//! - **One-shot Readings**: Temperature & humidity per refresh request
//! - **Firmware Check**: Compare the device firmware against the latest
//!   known revision
//! - **Pluggable Persistence**: Readings are written through the
//!   [`storage::SensorStore`] trait
//! - **Multi-sensor Support**: Manage any number of sensors at once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hygrotemp_ble::{DeviceManager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Create device manager and start scanning
//!     let manager = DeviceManager::new().await?;
//!     manager.start_scanning().await?;
//!
//!     // Wait for sensors to be discovered
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!
//!     // Run one refresh cycle on everything we found
//!     for (id, sensor) in manager.sensors() {
//!         println!("Found sensor: {} ({})", sensor.name(), id);
//!         sensor.refresh().await?;
//!     }
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod device_manager;
pub mod error;
pub mod protocol;
pub mod sensor;
pub mod storage;
pub mod utils;
pub mod version;

// Re-exports for convenience
pub use device_manager::DeviceManager;
pub use error::{Error, Result};
pub use sensor::{CallbackHandle, Capability, Sensor, SensorStatus, LATEST_KNOWN_FIRMWARE};
pub use utils::{celsius_to_fahrenheit, fahrenheit_to_celsius};
pub use version::FirmwareVersion;

// Re-export commonly used types from submodules
pub use ble::connection::ConnectionState;
pub use ble::scanner::BleScanner;
pub use ble::services::{ServiceKind, ServiceState};
pub use protocol::Reading;
pub use storage::{DeviceRecord, MemoryStore, PersistencePolicy, ReadingRecord, SensorStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<DeviceManager>();
        let _ = std::any::TypeId::of::<Sensor>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<Reading>();
        let _ = std::any::TypeId::of::<SensorStatus>();
        let _ = std::any::TypeId::of::<MemoryStore>();
        let _ = std::any::TypeId::of::<FirmwareVersion>();
    }

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_latest_known_firmware_is_well_formed() {
        assert_eq!(LATEST_KNOWN_FIRMWARE.len(), 8);
    }
}
