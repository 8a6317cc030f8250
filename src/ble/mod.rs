//! BLE communication module.
//!
//! This module provides low-level Bluetooth Low Energy functionality
//! for discovering and communicating with hygrometer sensors.

pub mod connection;
pub mod scanner;
pub mod services;
pub mod uuids;

pub use connection::{ConnectionManager, ConnectionState};
pub use scanner::BleScanner;
pub use services::{ServiceDirectory, ServiceKind, ServiceState};
pub use uuids::*;
