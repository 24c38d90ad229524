//! Bluetooth connection handling for the RC car
//! This module handles connecting to and disconnecting from the car

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::error::{BleError, RadioError, Result};
use crate::core::bluetooth::radio::BleRadio;
use crate::core::bluetooth::types::{
    ConnectionHandle, ConnectionStatus, PeripheralDescriptor, SessionEvent, SessionState,
};
use crate::utils::with_timeout;

/// Read-only view of the session's connection slot
#[derive(Clone)]
pub struct ConnectionReader(Arc<RwLock<Option<ConnectionHandle>>>);

impl ConnectionReader {
    pub async fn current(&self) -> Option<ConnectionHandle> {
        self.0.read().await.clone()
    }
}

/// Owns the single active connection.
///
/// The handle lock is only ever held for a read or a swap, never across radio
/// calls. A connect in flight is tracked separately so readers see
/// "not connected" until it finishes.
pub struct ConnectionManager {
    radio: Arc<dyn BleRadio>,
    state: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    handle: Arc<RwLock<Option<ConnectionHandle>>>,
    connect_gate: Mutex<()>,
    pending_connect: Mutex<Option<CancellationToken>>,
    connect_timeout: Option<Duration>,
}

impl ConnectionManager {
    pub fn new(
        radio: Arc<dyn BleRadio>,
        state: Arc<watch::Sender<SessionState>>,
        events: broadcast::Sender<SessionEvent>,
        connect_timeout: Option<Duration>,
    ) -> Self {
        Self {
            radio,
            state,
            events,
            handle: Arc::new(RwLock::new(None)),
            connect_gate: Mutex::new(()),
            pending_connect: Mutex::new(None),
            connect_timeout,
        }
    }

    pub fn reader(&self) -> ConnectionReader {
        ConnectionReader(self.handle.clone())
    }

    pub async fn current(&self) -> Option<ConnectionHandle> {
        self.handle.read().await.clone()
    }

    /// Opens a link and discovers its services. The handle is only published
    /// once discovery succeeded; on failure the session stays disconnected and
    /// connect may simply be called again.
    ///
    /// `on_linked` runs after discovery and before the handle and the
    /// `Connected` status are published. It is dropped unpolled on failure.
    pub async fn connect<F>(&self, descriptor: &PeripheralDescriptor, on_linked: F) -> Result<ConnectionHandle>
    where
        F: Future<Output = ()>,
    {
        let Ok(_gate) = self.connect_gate.try_lock() else {
            return Err(BleError::ConnectInProgress(descriptor.id.to_string()));
        };
        if let Some(existing) = self.current().await {
            return Err(BleError::AlreadyConnected(existing.id().to_string()));
        }

        info!(
            "Device details - ID: {}, Name: {:?}",
            descriptor.id,
            descriptor.effective_name()
        );
        self.state
            .send_modify(|state| state.connection = ConnectionStatus::Connecting(descriptor.clone()));
        let _ = self.events.send(SessionEvent::Connecting(descriptor.clone()));

        let cancel_token = CancellationToken::new();
        *self.pending_connect.lock().await = Some(cancel_token.clone());

        let result = tokio::select! {
            result = with_timeout(self.connect_timeout, "connect", self.try_connect(descriptor)) => result,
            _ = cancel_token.cancelled() => Err(RadioError::Abandoned("connect")),
        };
        let result = match result {
            Ok(handle) => {
                on_linked.await;
                Ok(handle)
            }
            Err(e) => Err(e),
        };

        // Held until the handle is published so a disconnect either abandons
        // this connect or sees its handle
        let mut pending = self.pending_connect.lock().await;
        pending.take();
        let result = match result {
            Ok(_) if cancel_token.is_cancelled() => Err(RadioError::Abandoned("connect")),
            result => result,
        };

        match result {
            Ok(handle) => {
                *self.handle.write().await = Some(handle.clone());
                drop(pending);
                self.state
                    .send_modify(|state| state.connection = ConnectionStatus::Connected(descriptor.clone()));
                Ok(handle)
            }
            Err(e) => {
                drop(pending);
                error!("Failed to connect: {}", e);
                if matches!(e, RadioError::Timeout { .. } | RadioError::Abandoned(_)) {
                    if let Err(release_error) = self.radio.disconnect(&descriptor.id).await {
                        warn!("Failed to release link after {}: {}", e, release_error);
                    }
                }
                self.state
                    .send_modify(|state| state.connection = ConnectionStatus::Disconnected);
                let _ = self.events.send(SessionEvent::ConnectionFailed {
                    device_id: descriptor.id.clone(),
                    reason: e.to_string(),
                });
                Err(BleError::Connection {
                    device_id: descriptor.id.to_string(),
                    source: e,
                })
            }
        }
    }

    async fn try_connect(&self, descriptor: &PeripheralDescriptor) -> std::result::Result<ConnectionHandle, RadioError> {
        info!("Initiating connection to {}...", descriptor.id);
        let link = self.radio.connect(&descriptor.id).await?;

        info!("Connection successful, discovering services...");
        if let Err(e) = link.discover_services().await {
            warn!("Service discovery failed, releasing link to {}", descriptor.id);
            if let Err(release_error) = self.radio.disconnect(&descriptor.id).await {
                warn!("Failed to release link after discovery failure: {}", release_error);
            }
            return Err(e);
        }

        Ok(ConnectionHandle::new(descriptor.clone(), link))
    }

    /// Cancels the active link. On failure the handle is kept and the error returned.
    /// A connect still in flight is abandoned instead; it releases its own link.
    pub async fn try_disconnect(&self) -> Result<()> {
        if let Some(cancel_token) = self.pending_connect.lock().await.as_ref() {
            info!("Abandoning the pending connect");
            cancel_token.cancel();
            return Ok(());
        }

        let Some(handle) = self.current().await else {
            info!("No device connected, nothing to disconnect");
            return Ok(());
        };
        let device_id = handle.id().clone();

        info!("Disconnecting from device {}", device_id);
        match self.radio.disconnect(&device_id).await {
            Ok(()) => {
                let cleared = {
                    let mut slot = self.handle.write().await;
                    let same_link = slot.as_ref().is_some_and(|current| current.id() == &device_id);
                    if same_link {
                        *slot = None;
                    }
                    same_link
                };
                if cleared {
                    self.state
                        .send_modify(|state| state.connection = ConnectionStatus::Disconnected);
                    let _ = self.events.send(SessionEvent::Disconnected(device_id));
                    info!("Disconnected from device");
                }
                Ok(())
            }
            Err(e) => {
                let _ = self.events.send(SessionEvent::DisconnectFailed {
                    device_id: device_id.clone(),
                    reason: e.to_string(),
                });
                Err(BleError::Disconnect {
                    device_id: device_id.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Best-effort disconnect: failures are logged and the possibly stale handle is left in place.
    pub async fn disconnect(&self) {
        if let Err(e) = self.try_disconnect().await {
            error!("Failed to disconnect: {}", e);
        }
    }
}
