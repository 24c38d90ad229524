//! Core functionality for the RC car remote
//! This module contains the session that talks to the ESP32 car over BLE

pub mod bluetooth;

// Re-export commonly used types
pub use bluetooth::{Command, RemoteSession};
