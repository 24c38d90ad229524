//! Bluetooth functionality for the RC car remote
//! This module handles all bluetooth operations including permission
//! negotiation, scanning, connecting, and sending commands to the car.

#[cfg(feature = "native")]
mod bluest_radio;
mod commands;
mod connection;
mod constants;
mod device;
mod dispatcher;
mod error;
mod manager;
mod permissions;
mod radio;
mod scanner;
mod types;

// Re-export types that should be publicly accessible
#[cfg(feature = "native")]
pub use bluest_radio::BluestRadio;
pub use commands::{Command, CommandSender, DispatchOutcome, DriveControl, UnknownCommand};
pub use connection::{ConnectionManager, ConnectionReader};
pub use constants::*; // Re-export all constants
pub use device::NameFilter;
pub use dispatcher::CommandDispatcher;
pub use error::{BleError, RadioError};
pub use manager::RemoteSession;
pub use permissions::{
    HostPermissions, Permission, PermissionNegotiator, PermissionPrompter, PermissionStatus, Platform, Rationale,
};
pub use radio::{BleRadio, PeripheralLink, ScanStream};
pub use scanner::DeviceScanner;
pub use types::{
    ConnectionHandle, ConnectionStatus, PeripheralDescriptor, PeripheralId, ScanEvent, SessionEvent, SessionState,
};
