//! Control surface commands
//! This module defines the actions a front end invokes: the scan button,
//! picking a device, disconnecting, and holding the drive controls.

use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::core::bluetooth::{Command, CommandDispatcher, DispatchOutcome, DriveControl};
use crate::core::RemoteSession;

/// Message shown when a connection attempt fails
pub const CONNECTION_FAILED_MESSAGE: &str = "Could not connect to the device.";

/// Message shown when scanning is refused for lack of permissions
pub const PERMISSIONS_REQUIRED_MESSAGE: &str = "Bluetooth permissions are required to scan for devices.";

/// What pressing the scan button did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPress {
    /// Permissions were refused, nothing was started
    PermissionsRequired,
    Started,
    Stopped,
}

pub struct ControlSurface {
    session: Arc<RemoteSession>,
    drive: DriveControl<CommandDispatcher>,
}

impl ControlSurface {
    pub fn new(session: Arc<RemoteSession>) -> Self {
        let drive = DriveControl::new(session.dispatcher());
        Self { session, drive }
    }

    pub fn session(&self) -> &Arc<RemoteSession> {
        &self.session
    }

    /// Asks for permissions, then toggles scanning
    pub async fn handle_scan_press(&self) -> ScanPress {
        if !self.session.request_permissions().await {
            info!("{}", PERMISSIONS_REQUIRED_MESSAGE);
            return ScanPress::PermissionsRequired;
        }

        if self.session.is_scanning() {
            self.session.stop_scan().await;
            ScanPress::Stopped
        } else {
            self.session.start_scan().await;
            ScanPress::Started
        }
    }

    /// Connects to a listed device. The error is the message to show the user.
    pub async fn handle_device_connect(&self, device_id: &str) -> Result<(), String> {
        match self.session.connect_by_id(device_id).await {
            Ok(_) => {
                self.session.stop_scan().await;
                Ok(())
            }
            Err(e) => {
                debug!("Connect to {} failed: {}", device_id, e);
                Err(CONNECTION_FAILED_MESSAGE.to_string())
            }
        }
    }

    pub async fn handle_disconnect(&self) {
        self.session.disconnect().await
    }

    /// Press-start on a directional control. Ignored while disconnected.
    pub async fn handle_press(&self, command: Command) -> DispatchOutcome {
        if !self.session.is_connected().await {
            return DispatchOutcome::NotConnected;
        }
        self.drive.press(command).await
    }

    /// Press-end on the held control. Ignored while disconnected.
    pub async fn handle_release(&self) -> DispatchOutcome {
        if !self.session.is_connected().await {
            return DispatchOutcome::NotConnected;
        }
        self.drive.release().await
    }

    /// Tap on the stop control
    pub async fn handle_stop_tap(&self) -> DispatchOutcome {
        if !self.session.is_connected().await {
            return DispatchOutcome::NotConnected;
        }
        self.drive.stop().await
    }

    pub async fn held_command(&self) -> Option<Command> {
        self.drive.held().await
    }
}
