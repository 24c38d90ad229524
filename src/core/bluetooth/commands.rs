//! RC car commands implementation
//! This module contains the commands that can be sent to the car and the
//! hold-to-move driver that turns press/release gestures into commands.

use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Car commands, one ASCII byte each on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Drive forward (`F`)
    Forward,
    /// Drive backward (`B`)
    Backward,
    /// Turn left (`L`)
    Left,
    /// Turn right (`R`)
    Right,
    /// Stop all motors (`S`)
    Stop,
    /// Forward while turning left (`G`)
    ForwardLeft,
    /// Forward while turning right (`I`)
    ForwardRight,
    /// Backward while turning left (`H`)
    BackwardLeft,
    /// Backward while turning right (`J`)
    BackwardRight,
}

impl Command {
    pub const ALL: [Command; 9] = [
        Self::Forward,
        Self::Backward,
        Self::Left,
        Self::Right,
        Self::Stop,
        Self::ForwardLeft,
        Self::ForwardRight,
        Self::BackwardLeft,
        Self::BackwardRight,
    ];

    /// The protocol token for this command
    pub fn token(&self) -> char {
        match self {
            Self::Forward => 'F',
            Self::Backward => 'B',
            Self::Left => 'L',
            Self::Right => 'R',
            Self::Stop => 'S',
            Self::ForwardLeft => 'G',
            Self::ForwardRight => 'I',
            Self::BackwardLeft => 'H',
            Self::BackwardRight => 'J',
        }
    }

    /// Convert the command to its byte representation
    pub fn to_bytes(&self) -> [u8; 1] {
        [self.token() as u8]
    }

    /// Parse a protocol token. Lowercase tokens are accepted.
    pub fn from_token(token: char) -> Option<Self> {
        let token = token.to_ascii_uppercase();
        Self::ALL.into_iter().find(|command| command.token() == token)
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command token: {0:?}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(token), None) => Self::from_token(token).ok_or_else(|| UnknownCommand(s.to_string())),
            _ => Err(UnknownCommand(s.to_string())),
        }
    }
}

/// What happened to a dispatched command. Dispatch never fails to the caller,
/// failures are reported here after being logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchOutcome {
    /// The write was acknowledged by the transport
    Written,
    /// No connection was active, nothing was written
    NotConnected,
    /// The write was attempted and failed
    Failed,
}

/// Command sender trait
#[async_trait::async_trait]
pub trait CommandSender: Send + Sync {
    /// Send a command to the car
    async fn send_command(&self, command: Command) -> DispatchOutcome;
}

/// Hold-to-move driver: pressing a control sends its command, releasing sends stop.
pub struct DriveControl<T: CommandSender> {
    command_sender: T,
    held: Mutex<Option<Command>>,
}

impl<T: CommandSender> DriveControl<T> {
    /// Create a new DriveControl
    pub fn new(command_sender: T) -> Self {
        Self {
            command_sender,
            held: Mutex::new(None),
        }
    }

    /// Press-start on a directional control
    pub async fn press(&self, command: Command) -> DispatchOutcome {
        debug!("Press: {:?}", command);
        *self.held.lock().await = (!command.is_stop()).then_some(command);
        self.command_sender.send_command(command).await
    }

    /// Press-end on whatever control is held
    pub async fn release(&self) -> DispatchOutcome {
        if let Some(command) = self.held.lock().await.take() {
            debug!("Release: {:?}", command);
        }
        self.command_sender.send_command(Command::Stop).await
    }

    /// A single tap on the stop control
    pub async fn stop(&self) -> DispatchOutcome {
        info!("Stop requested");
        self.held.lock().await.take();
        self.command_sender.send_command(Command::Stop).await
    }

    /// The directional command currently held down, if any
    pub async fn held(&self) -> Option<Command> {
        *self.held.lock().await
    }
}
