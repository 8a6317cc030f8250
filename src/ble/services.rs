//! Service resolution and per-service discovery state.
//!
//! Each of the sensor's services lives in an owning slot together with a
//! small discovery state machine. Slots are replaced, never patched: when a
//! service UUID shows up again on a later connect cycle the previous handle
//! is dropped before the new one is installed.

use btleplug::api::Service;
use tracing::debug;
use uuid::Uuid;

use crate::ble::uuids::{BATTERY_SERVICE_UUID, DATA_SERVICE_UUID, DEVICE_INFO_SERVICE_UUID};

/// Discovery state of a single service slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceState {
    /// No handle installed.
    #[default]
    Idle,
    /// A handle is installed and detail discovery is pending.
    DiscoveryRequested,
    /// Characteristic details are available.
    Discovered,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::DiscoveryRequested => write!(f, "DiscoveryRequested"),
            Self::Discovered => write!(f, "Discovered"),
        }
    }
}

/// The services this driver knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Standard Device Information service (firmware revision).
    DeviceInfo,
    /// Standard Battery service. Recognized but never activated on current
    /// sensor firmware.
    Battery,
    /// Proprietary temperature & humidity data service.
    Data,
}

impl ServiceKind {
    /// The fixed UUID of this service on the sensor.
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::DeviceInfo => DEVICE_INFO_SERVICE_UUID,
            Self::Battery => BATTERY_SERVICE_UUID,
            Self::Data => DATA_SERVICE_UUID,
        }
    }
}

/// An owning slot for one resolved service handle.
#[derive(Debug, Default)]
struct ServiceSlot {
    state: ServiceState,
    service: Option<Service>,
}

impl ServiceSlot {
    /// Install a new handle, dropping any previous one.
    fn install(&mut self, service: Service) {
        self.service = Some(service);
        self.state = ServiceState::DiscoveryRequested;
    }

    fn reset(&mut self) {
        self.service = None;
        self.state = ServiceState::Idle;
    }
}

/// Resolves discovered service UUIDs into owned slots and tracks each slot's
/// discovery state across one connect/discover cycle.
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    info: ServiceSlot,
    battery: ServiceSlot,
    data: ServiceSlot,
}

impl ServiceDirectory {
    /// Create an empty directory with all slots idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a discovered service to the directory.
    ///
    /// Returns the slot kind when the service was installed. The device
    /// information slot is skipped entirely once a valid firmware string is
    /// known (`firmware_known`), so repeated discovery cycles do not recreate
    /// it. The battery service is recognized but intentionally left inactive.
    pub fn resolve(&mut self, service: Service, firmware_known: bool) -> Option<ServiceKind> {
        let uuid = service.uuid;

        if uuid == DEVICE_INFO_SERVICE_UUID {
            if firmware_known {
                debug!("Firmware already known, skipping device information service");
                return None;
            }
            self.info.install(service);
            return Some(ServiceKind::DeviceInfo);
        }

        if uuid == BATTERY_SERVICE_UUID {
            // Battery flow is not activated on current sensor firmware.
            debug!("Battery service advertised but not activated");
            return None;
        }

        if uuid == DATA_SERVICE_UUID {
            self.data.install(service);
            return Some(ServiceKind::Data);
        }

        None
    }

    /// Kinds whose slots currently require detail discovery.
    pub fn requiring_discovery(&self) -> Vec<ServiceKind> {
        [ServiceKind::DeviceInfo, ServiceKind::Battery, ServiceKind::Data]
            .into_iter()
            .filter(|kind| self.state(*kind) == ServiceState::DiscoveryRequested)
            .collect()
    }

    /// Mark a slot as fully discovered.
    ///
    /// Only valid from `DiscoveryRequested`; any other state is left alone.
    pub fn complete(&mut self, kind: ServiceKind) {
        let slot = self.slot_mut(kind);
        if slot.state == ServiceState::DiscoveryRequested {
            slot.state = ServiceState::Discovered;
        }
    }

    /// Current discovery state of a slot.
    pub fn state(&self, kind: ServiceKind) -> ServiceState {
        self.slot(kind).state
    }

    /// The installed service handle for a slot, if any.
    pub fn service(&self, kind: ServiceKind) -> Option<&Service> {
        self.slot(kind).service.as_ref()
    }

    /// Drop all handles and return every slot to idle.
    ///
    /// Called when the connection goes away so the next cycle starts clean.
    pub fn reset(&mut self) {
        self.info.reset();
        self.battery.reset();
        self.data.reset();
    }

    fn slot(&self, kind: ServiceKind) -> &ServiceSlot {
        match kind {
            ServiceKind::DeviceInfo => &self.info,
            ServiceKind::Battery => &self.battery,
            ServiceKind::Data => &self.data,
        }
    }

    fn slot_mut(&mut self, kind: ServiceKind) -> &mut ServiceSlot {
        match kind {
            ServiceKind::DeviceInfo => &mut self.info,
            ServiceKind::Battery => &mut self.battery,
            ServiceKind::Data => &mut self.data,
        }
    }
}
