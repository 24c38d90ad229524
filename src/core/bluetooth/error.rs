//! Error types for the remote session.

use std::time::Duration;

use uuid::Uuid;

use crate::core::bluetooth::commands::Command;
use crate::core::bluetooth::permissions::Permission;

/// Failures reported by a radio backend.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    #[error("Bluetooth adapter is not available on this system")]
    NoAdapter,
    #[error("Device {0} not found")]
    DeviceNotFound(String),
    #[error("Service {service_uuid} not found for device {device_id}")]
    ServiceNotFound { device_id: String, service_uuid: Uuid },
    #[error("Characteristic {characteristic_uuid} not found for device {device_id}")]
    CharacteristicNotFound {
        device_id: String,
        characteristic_uuid: Uuid,
    },
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("{0} was abandoned")]
    Abandoned(&'static str),
    #[cfg(feature = "native")]
    #[error(transparent)]
    Bluest(#[from] bluest::Error),
    #[error("{0}")]
    Platform(String),
}

/// Session level error taxonomy. Every variant is scoped to the operation that produced it.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    #[error("Bluetooth permissions were not granted: {0:?}")]
    PermissionDenied(Vec<Permission>),
    #[error("Scan failed: {0}")]
    Scan(#[source] RadioError),
    #[error("Failed to connect to {device_id}: {source}")]
    Connection {
        device_id: String,
        #[source]
        source: RadioError,
    },
    #[error("Already connected to {0}")]
    AlreadyConnected(String),
    #[error("A connect is already in progress, {0} was not attempted")]
    ConnectInProgress(String),
    #[error("Failed to disconnect from {device_id}: {source}")]
    Disconnect {
        device_id: String,
        #[source]
        source: RadioError,
    },
    #[error("Failed to send command {command}: {source}")]
    CommandWrite {
        command: Command,
        #[source]
        source: RadioError,
    },
}

pub type Result<T, E = BleError> = std::result::Result<T, E>;
