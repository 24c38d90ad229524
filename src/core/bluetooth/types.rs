//! Defines shared data structures for the Bluetooth module.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::commands::Command;
use crate::core::bluetooth::radio::PeripheralLink;

/// Stable, platform-assigned peripheral identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeripheralId(pub String);

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeripheralId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A discovered peripheral as seen in one advertisement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeripheralDescriptor {
    /// Platform-specific unique identifier for the device
    pub id: PeripheralId,
    /// The advertised device name, if available
    pub name: Option<String>,
    /// The local name from the advertisement data, may differ from `name`
    pub local_name: Option<String>,
    /// MAC address when the platform id embeds one
    pub address: Option<String>,
    /// The signal strength (RSSI) at discovery
    pub rssi: Option<i16>,
}

/// One event from the radio during a scan
#[derive(Debug)]
pub enum ScanEvent {
    Discovered(PeripheralDescriptor),
    Failed(crate::core::bluetooth::error::RadioError),
}

/// Where the session's single connection stands
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", content = "device", rename_all = "kebab-case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    /// A link is being opened or its services discovered. Commands are not dispatched yet.
    Connecting(PeripheralDescriptor),
    Connected(PeripheralDescriptor),
}

/// Snapshot of the session, broadcast to observers on every change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Discovered devices in discovery order, unique by id
    pub devices: Vec<PeripheralDescriptor>,
    pub scanning: bool,
    pub connection: ConnectionStatus,
}

impl SessionState {
    pub fn connected_device(&self) -> Option<&PeripheralDescriptor> {
        match &self.connection {
            ConnectionStatus::Connected(device) => Some(device),
            _ => None,
        }
    }

    pub fn find_device(&self, id: &PeripheralId) -> Option<&PeripheralDescriptor> {
        self.devices.iter().find(|device| &device.id == id)
    }
}

/// Discrete notifications for the control surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum SessionEvent {
    ScanStart,
    DeviceFound(PeripheralDescriptor),
    ScanFailed(String),
    ScanComplete,
    StopScanComplete,
    Connecting(PeripheralDescriptor),
    Connected(PeripheralDescriptor),
    ConnectionFailed { device_id: PeripheralId, reason: String },
    Disconnected(PeripheralId),
    DisconnectFailed { device_id: PeripheralId, reason: String },
    CommandSent(Command),
    CommandFailed { command: Command, reason: String },
    PermissionsDenied(Vec<crate::core::bluetooth::permissions::Permission>),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScanStart => "scan-start",
            Self::DeviceFound(_) => "device-found",
            Self::ScanFailed(_) => "scan-failed",
            Self::ScanComplete => "scan-complete",
            Self::StopScanComplete => "stop-scan-complete",
            Self::Connecting(_) => "connecting",
            Self::Connected(_) => "connected",
            Self::ConnectionFailed { .. } => "connection-failed",
            Self::Disconnected(_) => "disconnected",
            Self::DisconnectFailed { .. } => "disconnect-failed",
            Self::CommandSent(_) => "command-sent",
            Self::CommandFailed { .. } => "command-failed",
            Self::PermissionsDenied(_) => "permissions-denied",
        }
    }
}

/// The exclusive active link to a peripheral, only created once service discovery succeeded.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub descriptor: PeripheralDescriptor,
    pub link: Arc<dyn PeripheralLink>,
}

impl ConnectionHandle {
    pub fn new(descriptor: PeripheralDescriptor, link: Arc<dyn PeripheralLink>) -> Self {
        Self { descriptor, link }
    }

    pub fn id(&self) -> &PeripheralId {
        &self.descriptor.id
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
