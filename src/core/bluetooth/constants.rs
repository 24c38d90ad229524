//! Constants used throughout the application
//! This module contains all the constant values used in the application,
//! such as UUIDs, name filters, timeouts, and other configuration values.

use uuid::Uuid;

/// The UUID of the RC car service exposed by the ESP32 firmware
pub const UUID_CAR_SERVICE: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);

/// The UUID of the command characteristic (write with response)
pub const UUID_COMMAND_CHAR: Uuid = Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);

/// Substrings accepted in a device name, matched case-insensitively
pub const DEVICE_NAME_FILTERS: [&str; 4] = ["esp32", "car", "remote", "kumanda"];

/// First Android API level that needs the split BLUETOOTH_SCAN/BLUETOOTH_CONNECT permissions
pub const ANDROID_SPLIT_PERMISSIONS_API_LEVEL: u32 = 31;

/// Timeout for connect and service discovery in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Timeout for a single command write in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 2_000;

/// Capacity of the session event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
