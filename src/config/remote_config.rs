use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::bluetooth::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS, DEVICE_NAME_FILTERS, UUID_CAR_SERVICE, UUID_COMMAND_CHAR,
};

/// BLE settings for talking to the car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Service exposed by the car firmware
    pub service_uuid: Uuid,
    /// Characteristic that receives the single byte commands
    pub command_characteristic_uuid: Uuid,
    /// A device is listed when its name contains one of these, ignoring case
    pub name_filters: Vec<String>,
    /// Upper bound for connect plus service discovery. `None` leaves it to the platform stack.
    pub connect_timeout_ms: Option<u64>,
    /// Upper bound for one command write. `None` leaves it to the platform stack.
    pub write_timeout_ms: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            service_uuid: UUID_CAR_SERVICE,
            command_characteristic_uuid: UUID_COMMAND_CHAR,
            name_filters: DEVICE_NAME_FILTERS.iter().map(|name| name.to_string()).collect(),
            connect_timeout_ms: Some(DEFAULT_CONNECT_TIMEOUT_MS),
            write_timeout_ms: Some(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }
}
