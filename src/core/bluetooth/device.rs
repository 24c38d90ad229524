//! Peripheral naming and the discovery name filter

use std::sync::LazyLock;

use regex::Regex;

use crate::core::bluetooth::constants::DEVICE_NAME_FILTERS;
use crate::core::bluetooth::types::{PeripheralDescriptor, PeripheralId};

static MAC_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").expect("valid MAC regex"));

impl PeripheralDescriptor {
    pub fn new(id: impl Into<String>, name: Option<String>, local_name: Option<String>, rssi: Option<i16>) -> Self {
        let id = PeripheralId(id.into());
        let address = extract_mac_address(&id.0);
        Self {
            id,
            name,
            local_name,
            address,
            rssi,
        }
    }

    /// Local name if present, else the advertised name, else empty
    pub fn effective_name(&self) -> &str {
        self.local_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.name.as_deref())
            .unwrap_or("")
    }

    /// Name for list rows
    pub fn display_name(&self) -> &str {
        match self.effective_name() {
            "" => "Unknown Device",
            name => name,
        }
    }
}

/// Case-insensitive substring filter on device names
#[derive(Debug, Clone)]
pub struct NameFilter {
    needles: Vec<String>,
}

impl NameFilter {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(|needle| needle.as_ref().to_lowercase())
                .filter(|needle| !needle.is_empty())
                .collect(),
        }
    }

    /// Devices without an advertised name are never accepted.
    pub fn accepts(&self, device: &PeripheralDescriptor) -> bool {
        if device.name.as_deref().is_none_or(str::is_empty) {
            return false;
        }
        let name = device.effective_name().to_lowercase();
        self.needles.iter().any(|needle| name.contains(needle.as_str()))
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(DEVICE_NAME_FILTERS)
    }
}

fn extract_mac_address(device_id: &str) -> Option<String> {
    MAC_ADDRESS
        .find_iter(device_id)
        .last()
        .map(|m| m.as_str().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: Option<&str>, local_name: Option<&str>) -> PeripheralDescriptor {
        PeripheralDescriptor::new("id", name.map(String::from), local_name.map(String::from), None)
    }

    #[test]
    fn accepts_any_filter_substring_ignoring_case() {
        let filter = NameFilter::default();
        assert!(filter.accepts(&named(Some("MyESP32Car"), None)));
        assert!(filter.accepts(&named(Some("RC-REMOTE"), None)));
        assert!(filter.accepts(&named(Some("Kumanda 2"), None)));
        assert!(!filter.accepts(&named(Some("Garage Light"), None)));
    }

    #[test]
    fn unnamed_devices_are_rejected() {
        let filter = NameFilter::default();
        assert!(!filter.accepts(&named(None, None)));
        assert!(!filter.accepts(&named(Some(""), None)));
        assert!(!filter.accepts(&named(None, Some("esp32"))));
    }

    #[test]
    fn local_name_wins_over_advertised_name() {
        let filter = NameFilter::default();
        let device = named(Some("esp32"), Some("Living Room Lamp"));
        assert_eq!(device.effective_name(), "Living Room Lamp");
        assert!(!filter.accepts(&device));

        let device = named(Some("Speaker"), Some("Race Car"));
        assert!(filter.accepts(&device));
    }

    #[test]
    fn address_is_extracted_from_platform_id() {
        let device = PeripheralDescriptor::new("BluetoothLE#BluetoothLE00:1a:7d:da:71:13-24:0a:c4:1b:2c:3d", None, None, None);
        assert_eq!(device.address.as_deref(), Some("24:0A:C4:1B:2C:3D"));
        assert_eq!(device.display_name(), "Unknown Device");

        let device = PeripheralDescriptor::new("6C3F2D1A-0000-4B4B-9F00-1234ABCD", None, None, None);
        assert_eq!(device.address, None);
    }
}
