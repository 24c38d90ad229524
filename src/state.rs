//! Application state management
//! This module defines and manages the global application state.

use std::sync::Arc;

use log::info;

use crate::commands::ControlSurface;
use crate::config::AppConfig;
use crate::core::bluetooth::{BleRadio, PermissionPrompter};
use crate::core::RemoteSession;

/// Global application state
pub struct AppState {
    pub config: AppConfig,
    /// The remote session instance
    pub session: Arc<RemoteSession>,
    pub control_surface: ControlSurface,
}

impl AppState {
    /// Creates the state on top of a radio and the host's permission prompts.
    /// Mobile hosts pass a prompter that shows their OS dialogs.
    pub fn with_parts(config: AppConfig, radio: Arc<dyn BleRadio>, prompter: Arc<dyn PermissionPrompter>) -> Self {
        info!("Initializing RemoteSession...");
        let session = Arc::new(RemoteSession::new(radio, prompter, &config.remote));
        let control_surface = ControlSurface::new(session.clone());
        Self {
            config,
            session,
            control_surface,
        }
    }

    /// Creates the state on top of the platform radio, for hosts without runtime permissions
    #[cfg(feature = "native")]
    pub fn new(config: AppConfig) -> Self {
        use crate::core::bluetooth::{BluestRadio, HostPermissions};

        Self::with_parts(config, Arc::new(BluestRadio::new()), Arc::new(HostPermissions))
    }

    /// Gets a reference to the session
    pub fn get_session_arc(&self) -> Arc<RemoteSession> {
        self.session.clone()
    }
}
