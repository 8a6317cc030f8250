//! Device manager for discovering and managing hygrometer sensors.
//!
//! This module handles BLE scanning and the sensor list the surrounding
//! application works with. Sensors are created when their advertisement is
//! first seen and destroyed when their list entry is removed.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::ble::scanner::{BleScanner, SensorDiscoveryEvent};
use crate::error::Result;
use crate::sensor::{CallbackHandle, Sensor};
use crate::storage::{PersistencePolicy, SensorStore};

type SharedStore = Arc<RwLock<Option<Arc<dyn SensorStore>>>>;

/// Central manager for discovering and managing hygrometer sensors.
pub struct DeviceManager {
    /// BLE scanner.
    scanner: Arc<BleScanner>,
    /// Discovered sensors by BLE identifier.
    sensors: Arc<RwLock<HashMap<String, Arc<Sensor>>>>,
    /// Storage collaborator handed to newly created sensors.
    store: SharedStore,
    /// Persistence policy handed to newly created sensors.
    persistence: Arc<RwLock<PersistencePolicy>>,
    /// Sensor discovery channel.
    sensor_discovered_tx: broadcast::Sender<Arc<Sensor>>,
    /// Callback ID counter.
    callback_counter: AtomicU64,
    /// Background task handle.
    background_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
    /// Running flag.
    is_running: Arc<AtomicBool>,
}

impl DeviceManager {
    /// Create a new DeviceManager instance.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let scanner = BleScanner::new().await?;

        let (sensor_discovered_tx, _) = broadcast::channel(32);

        Ok(Self {
            scanner: Arc::new(scanner),
            sensors: Arc::new(RwLock::new(HashMap::new())),
            store: Arc::new(RwLock::new(None)),
            persistence: Arc::new(RwLock::new(PersistencePolicy::default())),
            sensor_discovered_tx,
            callback_counter: AtomicU64::new(0),
            background_handle: RwLock::new(None),
            is_running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Attach the storage collaborator handed to newly created sensors.
    pub fn set_store(&self, store: Arc<dyn SensorStore>) {
        *self.store.write() = Some(store);
    }

    /// Set the persistence policy handed to newly created sensors.
    pub fn set_persistence(&self, policy: PersistencePolicy) {
        *self.persistence.write() = policy;
    }

    /// Initialize Bluetooth and start scanning for sensors.
    pub async fn start_scanning(&self) -> Result<()> {
        if self.is_running.load(Ordering::SeqCst) {
            debug!("Already scanning");
            return Ok(());
        }

        info!("Starting device manager scanning");

        self.scanner.start_scanning().await?;
        self.is_running.store(true, Ordering::SeqCst);

        // Start background task to process discovery events
        let scanner = self.scanner.clone();
        let sensors = self.sensors.clone();
        let store = self.store.clone();
        let persistence = self.persistence.clone();
        let sensor_discovered_tx = self.sensor_discovered_tx.clone();
        let is_running = self.is_running.clone();

        let handle = tokio::spawn(async move {
            let mut rx = scanner.subscribe();

            while is_running.load(Ordering::SeqCst) {
                tokio::select! {
                    Ok(event) = rx.recv() => {
                        Self::handle_discovery_event(
                            event,
                            &sensors,
                            &store,
                            &persistence,
                            &sensor_discovered_tx,
                        );
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        // Periodic check of the running flag
                    }
                }
            }

            debug!("Device manager background task ended");
        });

        *self.background_handle.write() = Some(handle);

        Ok(())
    }

    /// Stop scanning for sensors.
    pub async fn stop_scanning(&self) -> Result<()> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Ok(());
        }

        info!("Stopping device manager scanning");

        self.is_running.store(false, Ordering::SeqCst);
        self.scanner.stop_scanning().await?;

        // Wait for background task
        if let Some(handle) = self.background_handle.write().take() {
            let _ = handle.await;
        }

        Ok(())
    }

    /// Get all discovered sensors.
    pub fn sensors(&self) -> HashMap<String, Arc<Sensor>> {
        self.sensors.read().clone()
    }

    /// Get a specific sensor by BLE identifier.
    pub fn get_sensor(&self, identifier: &str) -> Option<Arc<Sensor>> {
        self.sensors.read().get(identifier).cloned()
    }

    /// Get the number of discovered sensors.
    pub fn sensor_count(&self) -> usize {
        self.sensors.read().len()
    }

    /// Remove a sensor from the list, destroying the instance.
    ///
    /// Returns the removed sensor, if it was known.
    pub fn remove_sensor(&self, identifier: &str) -> Option<Arc<Sensor>> {
        self.sensors.write().remove(identifier)
    }

    /// Run one refresh request on every known sensor.
    ///
    /// Failures are logged per sensor and do not stop the sweep.
    pub async fn refresh_all(&self) {
        let sensors: Vec<_> = self.sensors.read().values().cloned().collect();
        for sensor in sensors {
            if let Err(e) = sensor.refresh().await {
                warn!("Refresh of {} failed: {}", sensor.address(), e);
            }
        }
    }

    /// Subscribe to sensor discovery events.
    pub fn subscribe_sensor_discovered(&self) -> broadcast::Receiver<Arc<Sensor>> {
        self.sensor_discovered_tx.subscribe()
    }

    /// Register a callback for when sensors are discovered/updated.
    pub fn on_sensor_discovered<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(Arc<Sensor>) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.sensor_discovered_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(sensor) = rx.recv().await {
                callback(sensor);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Check if scanning is active.
    pub fn is_scanning(&self) -> bool {
        self.scanner.is_scanning()
    }

    /// Clean shutdown of all connections and scanning.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down device manager");

        self.stop_scanning().await?;

        // Disconnect all sensors
        let sensors: Vec<_> = self.sensors.read().values().cloned().collect();
        for sensor in sensors {
            if let Err(e) = sensor.disconnect().await {
                warn!("Error disconnecting sensor {}: {}", sensor.address(), e);
            }
        }

        // Clear sensors
        self.sensors.write().clear();

        Ok(())
    }

    /// Handle a discovery event from the scanner.
    fn handle_discovery_event(
        event: SensorDiscoveryEvent,
        sensors: &Arc<RwLock<HashMap<String, Arc<Sensor>>>>,
        store: &SharedStore,
        persistence: &Arc<RwLock<PersistencePolicy>>,
        sensor_discovered_tx: &broadcast::Sender<Arc<Sensor>>,
    ) {
        let identifier = event.identifier.clone();

        let existing = sensors.read().get(&identifier).cloned();

        let sensor = match existing {
            Some(sensor) => {
                // Update existing sensor with new advertising data
                sensor.update_from_advertising(event.rssi);
                sensor
            }
            None => {
                let name = event
                    .local_name
                    .clone()
                    .unwrap_or_else(|| "Hygrotemp".to_string());

                let sensor = Arc::new(Sensor::new(identifier.clone(), name, event.peripheral));
                sensor.update_from_advertising(event.rssi);

                if let Some(store) = store.read().clone() {
                    sensor.set_store(store);
                }
                sensor.set_persistence(*persistence.read());

                info!("Discovered new sensor: {} ({})", sensor.name(), identifier);

                sensors.write().insert(identifier, sensor.clone());
                sensor
            }
        };

        // Send discovery event
        let _ = sensor_discovered_tx.send(sensor);
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}
