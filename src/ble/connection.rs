//! BLE connection management.
//!
//! Handles the connect/disconnect cycle for a single hygrometer sensor.
//! The driver performs one read-and-disconnect cycle per refresh request,
//! so no auto-reconnect is armed here.

use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Connection state for a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected to the sensor.
    #[default]
    Disconnected,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the sensor.
    Connected,
    /// Currently disconnecting.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Event for connection state changes.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    /// The identifier of the peripheral.
    pub identifier: String,
    /// The new connection state.
    pub state: ConnectionState,
}

/// Manages the connection to one hygrometer sensor.
pub struct ConnectionManager {
    /// The peripheral to manage.
    peripheral: Peripheral,
    /// Current connection state.
    state: Arc<RwLock<ConnectionState>>,
    /// Channel for connection events.
    event_tx: broadcast::Sender<ConnectionEvent>,
    /// Maximum connection attempts per request.
    max_attempts: u32,
    /// Delay between attempts.
    retry_delay: Duration,
}

impl ConnectionManager {
    /// Create a new connection manager for a peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        let (event_tx, _) = broadcast::channel(16);

        Self {
            peripheral,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribe to connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Get the peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    /// Attempt to connect to the sensor and run BLE service discovery.
    pub async fn connect(&self) -> Result<()> {
        let current_state = *self.state.read();

        if current_state.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        if current_state.is_transitioning() {
            return Err(Error::ConnectionFailed {
                reason: "Connection already in progress".to_string(),
            });
        }

        self.set_state(ConnectionState::Connecting);

        // Check if already connected at BLE level
        if self.peripheral.is_connected().await.unwrap_or(false) {
            info!("Peripheral already connected at BLE level");
            self.discover_services().await;
            self.set_state(ConnectionState::Connected);
            return Ok(());
        }

        let mut attempts = 0;
        while attempts < self.max_attempts {
            attempts += 1;

            debug!("Connection attempt {} of {}", attempts, self.max_attempts);

            match self.peripheral.connect().await {
                Ok(_) => {
                    info!("Successfully connected to sensor");
                    self.discover_services().await;
                    self.set_state(ConnectionState::Connected);
                    return Ok(());
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", attempts, e);

                    if attempts < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        Err(Error::ConnectionFailed {
            reason: format!("Failed after {} attempts", self.max_attempts),
        })
    }

    /// Disconnect from the sensor.
    pub async fn disconnect(&self) -> Result<()> {
        let current_state = *self.state.read();

        if matches!(
            current_state,
            ConnectionState::Disconnected | ConnectionState::Disconnecting
        ) {
            return Ok(());
        }

        self.set_state(ConnectionState::Disconnecting);

        match self.peripheral.disconnect().await {
            Ok(_) => {
                info!("Successfully disconnected from sensor");
                self.set_state(ConnectionState::Disconnected);
                Ok(())
            }
            Err(e) => {
                error!("Failed to disconnect: {}", e);
                self.set_state(ConnectionState::Disconnected);
                Err(Error::Bluetooth(e))
            }
        }
    }

    /// Set the connection retry parameters.
    pub fn set_retry_params(&mut self, max_attempts: u32, delay: Duration) {
        self.max_attempts = max_attempts;
        self.retry_delay = delay;
    }

    /// Run BLE service discovery, logging failures.
    ///
    /// A failed discovery leaves the peripheral with an empty service list;
    /// the resolver then has nothing to install and the refresh goes nowhere,
    /// which matches the abandoned-operation semantics of the driver.
    async fn discover_services(&self) {
        if let Err(e) = self.peripheral.discover_services().await {
            warn!("Failed to discover services: {}", e);
        }
    }

    /// Update the connection state and emit an event.
    fn set_state(&self, new_state: ConnectionState) {
        let old_state = {
            let mut state = self.state.write();
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            debug!("Connection state changed: {} -> {}", old_state, new_state);

            let _ = self.event_tx.send(ConnectionEvent {
                identifier: format!("{:?}", self.peripheral.id()),
                state: new_state,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());

        assert!(ConnectionState::Connecting.is_transitioning());
        assert!(ConnectionState::Disconnecting.is_transitioning());
        assert!(!ConnectionState::Connected.is_transitioning());
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Connected), "Connected");
        assert_eq!(format!("{}", ConnectionState::Disconnected), "Disconnected");
    }
}
