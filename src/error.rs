//! Error types for the hygrotemp-ble crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// The specified sensor was not found.
    #[error("Sensor not found: {identifier}")]
    SensorNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// Operation requires a connection but the sensor is not connected.
    #[error("Sensor not connected")]
    NotConnected,

    /// Failed to establish a connection to the sensor.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Description of why the connection failed.
        reason: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Descriptor not found on a characteristic.
    #[error("Descriptor not found: {uuid}")]
    DescriptorNotFound {
        /// The UUID of the descriptor that was not found.
        uuid: String,
    },

    /// A notification frame carried the marker byte but was otherwise unusable.
    #[error("Malformed frame: {context}")]
    MalformedFrame {
        /// Description of what was wrong with the frame.
        context: String,
    },

    /// A numeric payload field did not contain ASCII decimal text.
    #[error("Invalid {field} field: {text:?}")]
    InvalidField {
        /// The name of the field that failed to parse.
        field: &'static str,
        /// The raw text that was rejected.
        text: String,
    },

    /// The storage collaborator reported a write failure.
    #[error("Storage error: {context}")]
    Storage {
        /// Description of the failed write.
        context: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
