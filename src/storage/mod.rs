//! Persistence collaborator seam.
//!
//! The relational layer itself lives outside this crate; what lives here is
//! the contract the driver writes through: an upsert of a timestamped
//! measurement row keyed by (device address, hour bucket), last-write-wins,
//! and an update of the device's last-known firmware/battery fields keyed by
//! address. Write failures are non-fatal to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::Result;
use crate::protocol::Reading;
use crate::utils::truncate_to_hour;

/// A timestamped measurement row.
///
/// Upserted per (device address, hour): a second reading within the same
/// hour replaces the first.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadingRecord {
    /// BLE address of the sensor the reading came from.
    pub device_address: String,
    /// Hour bucket the reading falls into.
    pub hour: DateTime<Local>,
    /// Full timestamp of the reading.
    pub timestamp: DateTime<Local>,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: i32,
}

impl ReadingRecord {
    /// Build the record for a decoded reading.
    pub fn new(device_address: impl Into<String>, reading: &Reading) -> Self {
        Self {
            device_address: device_address.into(),
            hour: truncate_to_hour(reading.timestamp),
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

/// The device's last-known firmware and battery fields, updated per address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceRecord {
    /// BLE address of the sensor.
    pub device_address: String,
    /// Last-known firmware revision string.
    pub firmware: String,
    /// Last-known battery level in percent, if any was ever read.
    pub battery: Option<u8>,
}

/// Controls whether decoded readings are persisted at all.
///
/// Mirrors the two upstream database targets; persistence happens when
/// either is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistencePolicy {
    /// Persist to the local database.
    pub local: bool,
    /// Persist to the remote database.
    pub remote: bool,
}

impl PersistencePolicy {
    /// Whether any persistence target is enabled.
    pub fn is_enabled(&self) -> bool {
        self.local || self.remote
    }
}

/// Storage collaborator the driver writes readings through.
///
/// Implementations are expected to map these calls onto their own tables;
/// the driver treats any failure as non-fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Upsert a measurement row, keyed by (device address, hour).
    async fn upsert_reading(&self, record: ReadingRecord) -> Result<()>;

    /// Update the device's last-known firmware/battery fields.
    async fn update_device(&self, record: DeviceRecord) -> Result<()>;
}

/// In-process reference implementation of [`SensorStore`].
///
/// Keyed exactly like the external tables; useful for demos and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: RwLock<HashMap<(String, DateTime<Local>), ReadingRecord>>,
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored measurement rows, in no particular order.
    pub fn readings(&self) -> Vec<ReadingRecord> {
        self.readings.read().values().cloned().collect()
    }

    /// The stored measurement row for one (address, hour) key, if any.
    pub fn reading(&self, address: &str, hour: DateTime<Local>) -> Option<ReadingRecord> {
        self.readings
            .read()
            .get(&(address.to_string(), hour))
            .cloned()
    }

    /// The stored device row for an address, if any.
    pub fn device(&self, address: &str) -> Option<DeviceRecord> {
        self.devices.read().get(address).cloned()
    }
}

#[async_trait]
impl SensorStore for MemoryStore {
    async fn upsert_reading(&self, record: ReadingRecord) -> Result<()> {
        let key = (record.device_address.clone(), record.hour);
        self.readings.write().insert(key, record);
        Ok(())
    }

    async fn update_device(&self, record: DeviceRecord) -> Result<()> {
        self.devices
            .write()
            .insert(record.device_address.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn reading_at(minute: u32, temperature: f32) -> Reading {
        Reading {
            timestamp: Local.with_ymd_and_hms(2024, 5, 17, 14, minute, 0).unwrap(),
            temperature,
            humidity: 55,
        }
    }

    #[test]
    fn test_reading_record_hour_bucket() {
        let record = ReadingRecord::new("11:22:33:44:55:66", &reading_at(35, 21.5));

        assert_eq!(record.hour.format("%M:%S").to_string(), "00:00");
        assert_eq!(record.timestamp.format("%M").to_string(), "35");
        assert_eq!(record.temperature, 21.5);
        assert_eq!(record.humidity, 55);
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins_within_hour() {
        let store = MemoryStore::new();
        let addr = "11:22:33:44:55:66";

        let first = ReadingRecord::new(addr, &reading_at(10, 20.0));
        let second = ReadingRecord::new(addr, &reading_at(45, 22.0));
        assert_eq!(first.hour, second.hour);

        let hour = first.hour;
        let expected_timestamp = second.timestamp;
        store.upsert_reading(first).await.unwrap();
        store.upsert_reading(second).await.unwrap();

        assert_eq!(store.readings().len(), 1);
        let stored = store.reading(addr, hour).unwrap();
        assert_eq!(stored.temperature, 22.0);
        assert_eq!(stored.timestamp, expected_timestamp);
    }

    #[tokio::test]
    async fn test_distinct_hours_are_distinct_rows() {
        let store = MemoryStore::new();
        let addr = "11:22:33:44:55:66";

        let first = ReadingRecord::new(addr, &reading_at(10, 20.0));
        let mut later = first.clone();
        later.hour = Local.with_ymd_and_hms(2024, 5, 17, 15, 0, 0).unwrap();

        store.upsert_reading(first).await.unwrap();
        store.upsert_reading(later).await.unwrap();

        assert_eq!(store.readings().len(), 2);
    }

    #[tokio::test]
    async fn test_update_device_overwrites() {
        let store = MemoryStore::new();
        let addr = "11:22:33:44:55:66";

        store
            .update_device(DeviceRecord {
                device_address: addr.to_string(),
                firmware: "00.00.60".to_string(),
                battery: None,
            })
            .await
            .unwrap();
        store
            .update_device(DeviceRecord {
                device_address: addr.to_string(),
                firmware: "00.00.66".to_string(),
                battery: Some(88),
            })
            .await
            .unwrap();

        let device = store.device(addr).unwrap();
        assert_eq!(device.firmware, "00.00.66");
        assert_eq!(device.battery, Some(88));
    }

    #[test]
    fn test_persistence_policy() {
        assert!(!PersistencePolicy::default().is_enabled());
        assert!(PersistencePolicy {
            local: true,
            remote: false
        }
        .is_enabled());
        assert!(PersistencePolicy {
            local: false,
            remote: true
        }
        .is_enabled());
        assert!(PersistencePolicy {
            local: true,
            remote: true
        }
        .is_enabled());
    }
}
