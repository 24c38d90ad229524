//! Remote session for the RC car
//! This module provides the main interface for bluetooth operations

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::{broadcast, watch};

use crate::config::RemoteConfig;
use crate::core::bluetooth::commands::{Command, DispatchOutcome};
use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::constants::EVENT_CHANNEL_CAPACITY;
use crate::core::bluetooth::device::NameFilter;
use crate::core::bluetooth::dispatcher::CommandDispatcher;
use crate::core::bluetooth::error::{BleError, RadioError, Result};
use crate::core::bluetooth::permissions::{PermissionNegotiator, PermissionPrompter};
use crate::core::bluetooth::radio::BleRadio;
use crate::core::bluetooth::scanner::DeviceScanner;
use crate::core::bluetooth::types::{
    ConnectionHandle, PeripheralDescriptor, PeripheralId, SessionEvent, SessionState,
};

/// One remote-control session: permissions, discovery, the single connection and command dispatch.
///
/// State changes are published on a [`watch`] channel ([`RemoteSession::subscribe`]) and
/// discrete notifications on a [`broadcast`] channel ([`RemoteSession::events`]), so any
/// front end or a headless test can follow the session.
pub struct RemoteSession {
    radio: Arc<dyn BleRadio>,
    state: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    permissions: PermissionNegotiator,
    scanner: DeviceScanner,
    connection: ConnectionManager,
    dispatcher: CommandDispatcher,
}

impl RemoteSession {
    pub fn new(radio: Arc<dyn BleRadio>, prompter: Arc<dyn PermissionPrompter>, config: &RemoteConfig) -> Self {
        let state = Arc::new(watch::Sender::new(SessionState::default()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let scanner = DeviceScanner::new(
            radio.clone(),
            state.clone(),
            events.clone(),
            NameFilter::new(&config.name_filters),
        );
        let connection = ConnectionManager::new(
            radio.clone(),
            state.clone(),
            events.clone(),
            config.connect_timeout_ms.map(Duration::from_millis),
        );
        let dispatcher = CommandDispatcher::new(
            connection.reader(),
            events.clone(),
            config.service_uuid,
            config.command_characteristic_uuid,
            config.write_timeout_ms.map(Duration::from_millis),
        );

        Self {
            radio,
            state,
            events,
            permissions: PermissionNegotiator::new(prompter),
            scanner,
            connection,
            dispatcher,
        }
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Follow discrete session events
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn devices(&self) -> Vec<PeripheralDescriptor> {
        self.state.borrow().devices.clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.is_scanning()
    }

    pub async fn connection(&self) -> Option<ConnectionHandle> {
        self.connection.current().await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.current().await.is_some()
    }

    pub fn dispatcher(&self) -> CommandDispatcher {
        self.dispatcher.clone()
    }

    /// `true` when every permission needed for scanning was granted
    pub async fn request_permissions(&self) -> bool {
        self.negotiate_permissions().await.is_ok()
    }

    async fn negotiate_permissions(&self) -> Result<()> {
        self.permissions.negotiate().await.inspect_err(|e| match e {
            BleError::PermissionDenied(denied) => {
                let _ = self.events.send(SessionEvent::PermissionsDenied(denied.clone()));
            }
            e => error!("Permission request failed: {}", e),
        })
    }

    /// Starts a scan. Callers are expected to have obtained permissions first.
    pub async fn start_scan(&self) {
        self.scanner.start_scan().await
    }

    /// Negotiates permissions and only scans when they were all granted
    pub async fn scan_with_permissions(&self) -> Result<()> {
        self.negotiate_permissions().await?;
        self.start_scan().await;
        Ok(())
    }

    pub async fn stop_scan(&self) {
        self.scanner.stop_scan().await
    }

    /// Connects and discovers services. Any scan still running is stopped
    /// before the connection is published, so observers never see a
    /// connected session that is still scanning.
    pub async fn connect(&self, descriptor: &PeripheralDescriptor) -> Result<ConnectionHandle> {
        let handle = self
            .connection
            .connect(descriptor, self.scanner.stop_scan())
            .await?;

        info!("Connected to: {}", descriptor.display_name());
        let _ = self.events.send(SessionEvent::Connected(descriptor.clone()));
        Ok(handle)
    }

    /// Connects to a device from the discovered list
    pub async fn connect_by_id(&self, id: &str) -> Result<ConnectionHandle> {
        let id = PeripheralId::from(id);
        let descriptor = self.state.borrow().find_device(&id).cloned();
        match descriptor {
            Some(descriptor) => self.connect(&descriptor).await,
            None => Err(BleError::Connection {
                device_id: id.to_string(),
                source: RadioError::DeviceNotFound(id.to_string()),
            }),
        }
    }

    pub async fn try_disconnect(&self) -> Result<()> {
        self.connection.try_disconnect().await
    }

    /// Best-effort disconnect, see [`ConnectionManager::disconnect`]
    pub async fn disconnect(&self) {
        self.connection.disconnect().await
    }

    /// Best-effort command dispatch, see [`CommandDispatcher`]
    pub async fn send(&self, command: Command) -> DispatchOutcome {
        self.dispatcher.send(command).await
    }

    /// Stops scanning, drops the connection and releases the radio
    pub async fn shutdown(&self) {
        info!("Shutting down remote session");
        self.scanner.stop_scan().await;
        if self.is_connected().await {
            if let Err(e) = self.try_disconnect().await {
                warn!("Disconnect during shutdown failed: {}", e);
            }
        }
        self.radio.shutdown().await;
    }
}
