//! Best-effort command writes to the connected car.

use std::time::Duration;

use log::{error, info};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::bluetooth::commands::{Command, CommandSender, DispatchOutcome};
use crate::core::bluetooth::connection::ConnectionReader;
use crate::core::bluetooth::error::BleError;
use crate::core::bluetooth::types::{ConnectionHandle, SessionEvent};
use crate::utils::with_timeout;

/// Writes commands to the fixed command characteristic.
///
/// Dispatch is fire-and-forget: a failed write is logged and reported as
/// [`DispatchOutcome::Failed`], never retried and never returned as an error.
/// The connection is left untouched either way.
#[derive(Clone)]
pub struct CommandDispatcher {
    connection: ConnectionReader,
    events: broadcast::Sender<SessionEvent>,
    service_uuid: Uuid,
    characteristic_uuid: Uuid,
    write_timeout: Option<Duration>,
}

impl CommandDispatcher {
    pub fn new(
        connection: ConnectionReader,
        events: broadcast::Sender<SessionEvent>,
        service_uuid: Uuid,
        characteristic_uuid: Uuid,
        write_timeout: Option<Duration>,
    ) -> Self {
        Self {
            connection,
            events,
            service_uuid,
            characteristic_uuid,
            write_timeout,
        }
    }

    pub async fn send(&self, command: Command) -> DispatchOutcome {
        let Some(handle) = self.connection.current().await else {
            info!("No device connected, dropping command {}", command);
            return DispatchOutcome::NotConnected;
        };

        match self.write(&handle, command).await {
            Ok(()) => {
                info!("Sent command: {}", command);
                let _ = self.events.send(SessionEvent::CommandSent(command));
                DispatchOutcome::Written
            }
            Err(e) => {
                error!("{}", e);
                let _ = self.events.send(SessionEvent::CommandFailed {
                    command,
                    reason: e.to_string(),
                });
                DispatchOutcome::Failed
            }
        }
    }

    async fn write(&self, handle: &ConnectionHandle, command: Command) -> Result<(), BleError> {
        let data = command.to_bytes();
        with_timeout(
            self.write_timeout,
            "write",
            handle
                .link
                .write_with_response(self.service_uuid, self.characteristic_uuid, &data),
        )
        .await
        .map_err(|source| BleError::CommandWrite { command, source })
    }
}

#[async_trait::async_trait]
impl CommandSender for CommandDispatcher {
    async fn send_command(&self, command: Command) -> DispatchOutcome {
        self.send(command).await
    }
}
