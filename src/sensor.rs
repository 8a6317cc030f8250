//! Sensor struct and methods.
//!
//! Represents a single LCD hygrometer/thermometer sensor and drives its
//! refresh cycle: resolve services, read the firmware revision, enable
//! temperature & humidity notifications, decode one reading, persist it,
//! then disconnect. One reading per refresh request, not a stream.

use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use chrono::{DateTime, Local};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ble::connection::{ConnectionManager, ConnectionState};
use crate::ble::services::{ServiceDirectory, ServiceKind};
use crate::ble::uuids::{
    CCC_DESCRIPTOR_UUID, FIRMWARE_REVISION_UUID, NOTIFY_DISABLE, NOTIFY_ENABLE,
    TEMP_HUMIDITY_CHARACTERISTIC_UUID,
};
use crate::error::{Error, Result};
use crate::protocol::Reading;
use crate::storage::{DeviceRecord, PersistencePolicy, ReadingRecord, SensorStore};
use crate::version::FirmwareVersion;

/// Latest firmware revision known for this sensor model.
pub const LATEST_KNOWN_FIRMWARE: &str = "00.00.66";

/// Length of a well-formed firmware revision string.
const FIRMWARE_LEN: usize = 8;

/// Placeholder some firmware revisions report before the real string is set.
const FIRMWARE_UNKNOWN: &str = "UNKN";

/// Callback handle for unregistering callbacks.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    /// Create a new callback handle.
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

/// Measurements the sensor can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capability {
    /// Ambient temperature.
    Temperature,
    /// Relative humidity.
    Humidity,
    /// Battery level. Only attached if the battery flow is ever activated.
    Battery,
}

/// Snapshot of the sensor's status fields, emitted on status updates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorStatus {
    /// Firmware revision string.
    pub firmware: String,
    /// Whether the firmware matches or exceeds the latest known revision.
    pub firmware_up_to_date: bool,
    /// Last-known battery level in percent.
    pub battery: Option<u8>,
}

/// Internal state for a sensor.
struct SensorState {
    /// Firmware revision string, empty until read.
    firmware: String,
    /// Whether the firmware is at least the latest known revision.
    firmware_up_to_date: bool,
    /// Last-known battery level.
    battery: Option<u8>,
    /// Last decoded temperature in degrees Celsius.
    temperature: Option<f32>,
    /// Last decoded humidity in percent.
    humidity: Option<i32>,
    /// Time of the last decoded reading.
    last_update: Option<DateTime<Local>>,
    /// RSSI value.
    rssi: Option<i16>,
    /// Measurements this sensor reports.
    capabilities: Vec<Capability>,
}

impl SensorState {
    fn new() -> Self {
        Self {
            firmware: String::new(),
            firmware_up_to_date: false,
            battery: None,
            temperature: None,
            humidity: None,
            last_update: None,
            rssi: None,
            capabilities: vec![Capability::Temperature, Capability::Humidity],
        }
    }
}

/// Whether a firmware string is a real revision rather than empty or the
/// factory placeholder.
fn firmware_is_valid(firmware: &str) -> bool {
    !firmware.is_empty() && firmware != FIRMWARE_UNKNOWN
}

/// Connection-independent half of the sensor: state, events, persistence.
///
/// Split from the BLE handle so the decode/persist path can run from the
/// notification task and be exercised without a peripheral.
struct SensorCore {
    /// BLE address/identifier, also the persistence key.
    address: String,
    /// Shared state.
    state: RwLock<SensorState>,
    /// Storage collaborator, if any is attached.
    store: RwLock<Option<Arc<dyn SensorStore>>>,
    /// Which persistence targets are enabled.
    persistence: RwLock<PersistencePolicy>,
    /// Decoded reading channel.
    reading_tx: broadcast::Sender<Reading>,
    /// Status update channel.
    status_tx: broadcast::Sender<SensorStatus>,
    /// Refresh completion channel (success flag).
    refresh_tx: broadcast::Sender<bool>,
}

impl SensorCore {
    fn new(address: String) -> Self {
        let (reading_tx, _) = broadcast::channel(16);
        let (status_tx, _) = broadcast::channel(16);
        let (refresh_tx, _) = broadcast::channel(16);

        Self {
            address,
            state: RwLock::new(SensorState::new()),
            store: RwLock::new(None),
            persistence: RwLock::new(PersistencePolicy::default()),
            reading_tx,
            status_tx,
            refresh_tx,
        }
    }

    /// Apply the value read from the firmware revision characteristic.
    ///
    /// Empty values are ignored. The up-to-date comparison and the status
    /// event only happen for strings of exactly the well-formed length.
    fn apply_firmware(&self, value: &[u8]) {
        if value.is_empty() {
            return;
        }

        let firmware = String::from_utf8_lossy(value).to_string();
        self.state.write().firmware = firmware.clone();

        if firmware.len() == FIRMWARE_LEN
            && FirmwareVersion::new(&firmware) >= FirmwareVersion::new(LATEST_KNOWN_FIRMWARE)
        {
            let status = {
                let mut state = self.state.write();
                state.firmware_up_to_date = true;
                SensorStatus {
                    firmware: state.firmware.clone(),
                    firmware_up_to_date: true,
                    battery: state.battery,
                }
            };
            let _ = self.status_tx.send(status);
        }
    }

    /// Process one notification frame.
    ///
    /// Returns `true` when the frame completed the refresh cycle with a
    /// decoded reading. Frames without the marker and undecodable frames
    /// change nothing and write nothing.
    async fn handle_frame(&self, data: &[u8]) -> bool {
        let reading = match Reading::parse(data) {
            Ok(Some(reading)) => reading,
            Ok(None) => return false,
            Err(e) => {
                debug!("Discarding undecodable frame: {}", e);
                return false;
            }
        };

        debug!("Decoded reading: {}", reading);

        {
            let mut state = self.state.write();
            state.temperature = Some(reading.temperature);
            state.humidity = Some(reading.humidity);
            state.last_update = Some(reading.timestamp);
        }

        if self.persistence.read().is_enabled() {
            self.persist(&reading).await;
        }

        let _ = self.reading_tx.send(reading);
        let _ = self.refresh_tx.send(true);

        true
    }

    /// Write both storage rows for a decoded reading.
    ///
    /// Failures are logged and swallowed: they neither fail the refresh nor
    /// prevent the disconnect. Both writes are attempted independently.
    async fn persist(&self, reading: &Reading) {
        let store = match self.store.read().clone() {
            Some(store) => store,
            None => {
                debug!("Persistence enabled but no store attached");
                return;
            }
        };

        let record = ReadingRecord::new(self.address.as_str(), reading);
        if let Err(e) = store.upsert_reading(record).await {
            warn!("Failed to store reading for {}: {}", self.address, e);
        }

        let device = {
            let state = self.state.read();
            DeviceRecord {
                device_address: self.address.clone(),
                firmware: state.firmware.clone(),
                battery: state.battery,
            }
        };
        if let Err(e) = store.update_device(device).await {
            warn!("Failed to update device row for {}: {}", self.address, e);
        }
    }
}

/// Represents a single LCD hygrometer/thermometer sensor.
pub struct Sensor {
    /// Display name.
    name: String,
    /// State, events and persistence.
    core: Arc<SensorCore>,
    /// Connection manager.
    connection: Arc<ConnectionManager>,
    /// Resolved service slots.
    services: RwLock<ServiceDirectory>,
    /// Handle to the notification task of the current cycle.
    reading_task: RwLock<Option<JoinHandle<()>>>,
    /// Callback ID counter.
    callback_counter: Arc<AtomicU64>,
}

impl Sensor {
    /// Create a new sensor instance.
    pub(crate) fn new(address: String, name: String, peripheral: Peripheral) -> Self {
        Self {
            name,
            core: Arc::new(SensorCore::new(address)),
            connection: Arc::new(ConnectionManager::new(peripheral)),
            services: RwLock::new(ServiceDirectory::new()),
            reading_task: RwLock::new(None),
            callback_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Update from advertising data.
    pub(crate) fn update_from_advertising(&self, rssi: Option<i16>) {
        self.core.state.write().rssi = rssi;
    }

    // === Identification ===

    /// Get the BLE address/identifier.
    pub fn address(&self) -> &str {
        &self.core.address
    }

    /// Get the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device classification used by the surrounding device list.
    pub fn kind(&self) -> &'static str {
        "thermometer"
    }

    /// Measurements this sensor reports.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.core.state.read().capabilities.clone()
    }

    // === Connection ===

    /// Get the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Get the signal strength (RSSI).
    pub fn rssi(&self) -> Option<i16> {
        self.core.state.read().rssi
    }

    // === Persistence configuration ===

    /// Attach the storage collaborator readings are written through.
    pub fn set_store(&self, store: Arc<dyn SensorStore>) {
        *self.core.store.write() = Some(store);
    }

    /// Set which persistence targets are enabled.
    pub fn set_persistence(&self, policy: PersistencePolicy) {
        *self.core.persistence.write() = policy;
    }

    // === Refresh cycle ===

    /// Run one refresh request.
    ///
    /// Connects (BLE service discovery runs inside), resolves the sensor's
    /// services, reads the firmware revision, enables temperature & humidity
    /// notifications and arms the notification task. The cycle completes
    /// asynchronously: a decoded reading emits `refresh finished(true)` and
    /// disconnects. Returns once the cycle is armed.
    pub async fn refresh(&self) -> Result<()> {
        info!("Refreshing sensor {}", self.core.address);

        self.connection.connect().await?;

        // Feed every discovered service through the resolver. Handles from a
        // previous cycle are replaced, not patched; the device information
        // slot is skipped entirely once the firmware is known.
        let completed = {
            let firmware_known = firmware_is_valid(&self.core.state.read().firmware);
            let mut services = self.services.write();

            for service in self.connection.peripheral().services() {
                if let Some(kind) = services.resolve(service, firmware_known) {
                    debug!("Resolved service slot: {:?}", kind);
                }
            }

            // btleplug delivers characteristic details together with service
            // discovery, so every pending slot completes immediately.
            let pending = services.requiring_discovery();
            for kind in &pending {
                services.complete(*kind);
            }
            pending
        };

        for kind in completed {
            match kind {
                ServiceKind::DeviceInfo => {
                    if let Err(e) = self.read_firmware().await {
                        warn!("Firmware read on {} failed: {}", self.core.address, e);
                    }
                }
                ServiceKind::Data => {
                    if let Err(e) = self.enable_notifications().await {
                        warn!(
                            "Enabling notifications on {} failed: {}",
                            self.core.address, e
                        );
                    }
                }
                // Not activated on current sensor firmware.
                ServiceKind::Battery => {}
            }
        }

        Ok(())
    }

    /// Disconnect from the sensor and stop the current cycle.
    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from sensor {}", self.core.address);

        if let Some(handle) = self.reading_task.write().take() {
            handle.abort();
        }

        self.connection.disconnect().await
    }

    // === State accessors ===

    /// Firmware revision string, empty until read.
    pub fn firmware(&self) -> String {
        self.core.state.read().firmware.clone()
    }

    /// Whether the firmware is at least the latest known revision.
    pub fn firmware_up_to_date(&self) -> bool {
        self.core.state.read().firmware_up_to_date
    }

    /// Last-known battery level in percent.
    pub fn battery(&self) -> Option<u8> {
        self.core.state.read().battery
    }

    /// Last decoded temperature in degrees Celsius.
    pub fn temperature(&self) -> Option<f32> {
        self.core.state.read().temperature
    }

    /// Last decoded humidity in percent.
    pub fn humidity(&self) -> Option<i32> {
        self.core.state.read().humidity
    }

    /// Time of the last decoded reading.
    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.core.state.read().last_update
    }

    // === Events ===

    /// Subscribe to decoded readings.
    pub fn subscribe_readings(&self) -> broadcast::Receiver<Reading> {
        self.core.reading_tx.subscribe()
    }

    /// Subscribe to status updates (firmware-check results).
    pub fn subscribe_status(&self) -> broadcast::Receiver<SensorStatus> {
        self.core.status_tx.subscribe()
    }

    /// Subscribe to refresh completion (success flag).
    pub fn subscribe_refresh_finished(&self) -> broadcast::Receiver<bool> {
        self.core.refresh_tx.subscribe()
    }

    /// Register a callback for decoded readings.
    pub fn on_reading<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&Reading) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.core.reading_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(reading) = rx.recv().await {
                callback(&reading);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Register a callback for status updates.
    pub fn on_status_updated<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&SensorStatus) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.core.status_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(status) = rx.recv().await {
                callback(&status);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Register a callback for refresh completion.
    pub fn on_refresh_finished<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.core.refresh_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(success) = rx.recv().await {
                callback(success);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    // === Internal ===

    /// Read the firmware revision characteristic of the information service.
    async fn read_firmware(&self) -> Result<()> {
        if !self.connection.is_connected() {
            return Err(Error::NotConnected);
        }

        let characteristic =
            self.service_characteristic(ServiceKind::DeviceInfo, FIRMWARE_REVISION_UUID)?;

        let value = self
            .connection
            .peripheral()
            .read(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        self.core.apply_firmware(&value);
        Ok(())
    }

    /// Enable notifications on the temperature & humidity characteristic.
    ///
    /// Writes the enable value to the Client Characteristic Configuration
    /// descriptor, then subscribes and arms the notification task.
    async fn enable_notifications(&self) -> Result<()> {
        if !self.connection.is_connected() {
            return Err(Error::NotConnected);
        }

        let characteristic =
            self.service_characteristic(ServiceKind::Data, TEMP_HUMIDITY_CHARACTERISTIC_UUID)?;

        let descriptor = characteristic
            .descriptors
            .iter()
            .find(|d| d.uuid == CCC_DESCRIPTOR_UUID)
            .cloned()
            .ok_or_else(|| Error::DescriptorNotFound {
                uuid: CCC_DESCRIPTOR_UUID.to_string(),
            })?;

        let peripheral = self.connection.peripheral();
        peripheral
            .write_descriptor(&descriptor, &NOTIFY_ENABLE)
            .await
            .map_err(Error::Bluetooth)?;
        self.confirm_descriptor_write(&NOTIFY_ENABLE);

        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(Error::Bluetooth)?;

        self.start_reading_task();
        Ok(())
    }

    /// Observe a confirmed CCC descriptor value.
    ///
    /// The disable sentinel is only noted; tearing the link down on it never
    /// shipped on the upstream driver.
    fn confirm_descriptor_write(&self, value: &[u8]) {
        if value == NOTIFY_DISABLE.as_slice() {
            debug!(
                "Notifications disabled on {}; leaving the link up",
                self.core.address
            );
        }
    }

    /// Start the background task that waits for one reading.
    fn start_reading_task(&self) {
        let core = self.core.clone();
        let connection = self.connection.clone();
        let peripheral = self.connection.peripheral().clone();

        let handle = tokio::spawn(async move {
            let mut notifications = match peripheral.notifications().await {
                Ok(n) => n,
                Err(e) => {
                    error!("Failed to open notification stream: {}", e);
                    return;
                }
            };

            debug!("Reading task started for {}", core.address);

            while let Some(notification) = notifications.next().await {
                if notification.uuid != TEMP_HUMIDITY_CHARACTERISTIC_UUID {
                    continue;
                }

                if core.handle_frame(&notification.value).await {
                    // One reading per refresh: tear the link down and stop.
                    if let Err(e) = connection.disconnect().await {
                        warn!("Disconnect after reading failed: {}", e);
                    }
                    break;
                }
            }

            debug!("Reading task ended for {}", core.address);
        });

        *self.reading_task.write() = Some(handle);
    }

    /// Look up a characteristic on one of the resolved service slots.
    fn service_characteristic(&self, kind: ServiceKind, uuid: Uuid) -> Result<Characteristic> {
        let services = self.services.read();
        let service = services
            .service(kind)
            .ok_or_else(|| Error::ServiceNotFound {
                uuid: kind.uuid().to_string(),
            })?;

        service
            .characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned()
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: uuid.to_string(),
            })
    }
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("address", &self.core.address)
            .field("name", &self.name)
            .field("connection_state", &self.connection_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockSensorStore;
    use pretty_assertions::assert_eq;

    fn core_with_store(store: MockSensorStore, policy: PersistencePolicy) -> SensorCore {
        let core = SensorCore::new("11:22:33:44:55:66".to_string());
        *core.store.write() = Some(Arc::new(store));
        *core.persistence.write() = policy;
        core
    }

    fn persist_everywhere() -> PersistencePolicy {
        PersistencePolicy {
            local: true,
            remote: true,
        }
    }

    #[test]
    fn test_firmware_is_valid() {
        assert!(!firmware_is_valid(""));
        assert!(!firmware_is_valid("UNKN"));
        assert!(firmware_is_valid("00.00.66"));
    }

    #[test]
    fn test_apply_firmware_up_to_date() {
        let core = SensorCore::new("aa".to_string());
        let mut status_rx = core.status_tx.subscribe();

        core.apply_firmware(b"00.00.66");

        let state = core.state.read();
        assert_eq!(state.firmware, "00.00.66");
        assert!(state.firmware_up_to_date);
        drop(state);

        let status = status_rx.try_recv().unwrap();
        assert!(status.firmware_up_to_date);
        assert_eq!(status.firmware, "00.00.66");
    }

    #[test]
    fn test_apply_firmware_newer_than_latest() {
        let core = SensorCore::new("aa".to_string());
        core.apply_firmware(b"00.00.70");
        assert!(core.state.read().firmware_up_to_date);
    }

    #[test]
    fn test_apply_firmware_lesser_version_stays_outdated() {
        let core = SensorCore::new("aa".to_string());
        let mut status_rx = core.status_tx.subscribe();

        core.apply_firmware(b"00.00.60");

        assert_eq!(core.state.read().firmware, "00.00.60");
        assert!(!core.state.read().firmware_up_to_date);
        assert!(status_rx.try_recv().is_err());
    }

    #[test]
    fn test_apply_firmware_wrong_length_never_compares() {
        let core = SensorCore::new("aa".to_string());
        let mut status_rx = core.status_tx.subscribe();

        // Higher than the latest known revision, but not 8 characters.
        core.apply_firmware(b"99.99.99.1");

        assert_eq!(core.state.read().firmware, "99.99.99.1");
        assert!(!core.state.read().firmware_up_to_date);
        assert!(status_rx.try_recv().is_err());
    }

    #[test]
    fn test_apply_firmware_empty_value_ignored() {
        let core = SensorCore::new("aa".to_string());
        core.apply_firmware(b"");
        assert_eq!(core.state.read().firmware, "");
    }

    #[tokio::test]
    async fn test_handle_frame_decodes_and_persists() {
        let mut store = MockSensorStore::new();
        store
            .expect_upsert_reading()
            .withf(|record: &ReadingRecord| {
                record.device_address == "11:22:33:44:55:66"
                    && record.temperature == 21.5
                    && record.humidity == 55
                    && record.hour <= record.timestamp
            })
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_update_device()
            .withf(|record: &DeviceRecord| record.device_address == "11:22:33:44:55:66")
            .times(1)
            .returning(|_| Ok(()));

        let core = core_with_store(store, persist_everywhere());
        let mut refresh_rx = core.refresh_tx.subscribe();
        let mut reading_rx = core.reading_tx.subscribe();

        assert!(core.handle_frame(b"T=21.5 H=55.0").await);

        let state = core.state.read();
        assert_eq!(state.temperature, Some(21.5));
        assert_eq!(state.humidity, Some(55));
        assert!(state.last_update.is_some());
        drop(state);

        assert_eq!(refresh_rx.try_recv().unwrap(), true);
        assert!(refresh_rx.try_recv().is_err());

        let reading = reading_rx.try_recv().unwrap();
        assert_eq!(reading.temperature, 21.5);
    }

    #[tokio::test]
    async fn test_handle_frame_without_marker_is_a_noop() {
        // No expectations: any storage call would panic the test.
        let core = core_with_store(MockSensorStore::new(), persist_everywhere());
        let mut refresh_rx = core.refresh_tx.subscribe();

        assert!(!core.handle_frame(&[0x00; 16]).await);
        assert!(!core.handle_frame(&[]).await);

        let state = core.state.read();
        assert_eq!(state.temperature, None);
        assert_eq!(state.humidity, None);
        assert_eq!(state.last_update, None);
        drop(state);

        assert!(refresh_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handle_frame_undecodable_is_dropped() {
        let core = core_with_store(MockSensorStore::new(), persist_everywhere());
        let mut refresh_rx = core.refresh_tx.subscribe();

        // Marker present, numeric fields garbage.
        assert!(!core.handle_frame(b"T=ab.c H=xx.x").await);

        assert_eq!(core.state.read().temperature, None);
        assert!(refresh_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handle_frame_storage_failure_still_succeeds() {
        let mut store = MockSensorStore::new();
        store.expect_upsert_reading().times(1).returning(|_| {
            Err(Error::Storage {
                context: "disk full".to_string(),
            })
        });
        // The second write is still attempted after the first one fails.
        store.expect_update_device().times(1).returning(|_| {
            Err(Error::Storage {
                context: "disk full".to_string(),
            })
        });

        let core = core_with_store(store, persist_everywhere());
        let mut refresh_rx = core.refresh_tx.subscribe();

        assert!(core.handle_frame(b"T=21.5 H=55.0").await);

        assert_eq!(core.state.read().temperature, Some(21.5));
        assert_eq!(refresh_rx.try_recv().unwrap(), true);
    }

    #[tokio::test]
    async fn test_handle_frame_persistence_disabled_skips_storage() {
        // No expectations: any storage call would panic the test.
        let core = core_with_store(MockSensorStore::new(), PersistencePolicy::default());
        let mut refresh_rx = core.refresh_tx.subscribe();

        assert!(core.handle_frame(b"T=21.5 H=55.0").await);

        assert_eq!(core.state.read().temperature, Some(21.5));
        assert_eq!(refresh_rx.try_recv().unwrap(), true);
    }

    #[test]
    fn test_default_capabilities() {
        let core = SensorCore::new("aa".to_string());
        let capabilities = core.state.read().capabilities.clone();
        assert_eq!(
            capabilities,
            vec![Capability::Temperature, Capability::Humidity]
        );
        assert!(!capabilities.contains(&Capability::Battery));
    }
}
