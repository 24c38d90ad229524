//! ESP32 RC car remote library
//! This is the main library for the BLE remote control of the ESP32 car.

// Module declarations
pub mod commands;
pub mod config;
pub mod core;
pub mod logging;
pub mod state;
pub mod utils;

pub use commands::{ControlSurface, ScanPress};
pub use crate::core::bluetooth::{BleError, Command, DispatchOutcome, SessionEvent, SessionState};
pub use crate::core::RemoteSession;
pub use state::AppState;
