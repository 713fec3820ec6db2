//! Connection Controller
//!
//! Owns the connect/disconnect state machine, the current server selection
//! and the telemetry loop bound to the session.
//!
//! # Invariants
//! - Exactly one server is selected at all times.
//! - The telemetry loop runs iff the session is `Connected`.
//! - Connecting zeroes elapsed time and rates; disconnecting freezes them.
//! - Changing the selection never touches connection state or telemetry.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use super::directory::{DirectoryError, Server, ServerDirectory};
use super::telemetry::{TelemetryConfig, TelemetrySimulator};
use super::types::{ConnectionState, Session};
use crate::events::{SessionEvent, SessionEventEmitter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Cannot {action} while {from:?}")]
    InvalidTransition {
        from: ConnectionState,
        action: &'static str,
    },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl serde::Serialize for ControllerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub struct ConnectionController {
    directory: ServerDirectory,
    session: Arc<Mutex<Session>>,
    telemetry: TelemetrySimulator,
    events: SessionEventEmitter,
}

impl ConnectionController {
    /// Create a controller with a fresh `Disconnected` session on the
    /// directory's first server
    pub fn new(
        directory: ServerDirectory,
        telemetry: TelemetryConfig,
        events: SessionEventEmitter,
    ) -> Self {
        let session = Session::new(directory.default_server());
        info!(
            "Session {} created (server: {})",
            session.id, session.selected.name
        );
        Self {
            directory,
            session: Arc::new(Mutex::new(session)),
            telemetry: TelemetrySimulator::new(telemetry),
            events,
        }
    }

    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.session.lock().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.session.lock().state
    }

    pub fn selected_server(&self) -> &'static Server {
        self.session.lock().selected
    }

    /// Whether the telemetry loop is currently running
    pub fn telemetry_running(&self) -> bool {
        self.telemetry.is_running()
    }

    /// Number of live telemetry tasks
    pub fn live_timers(&self) -> usize {
        self.telemetry.live_loops()
    }

    /// `Disconnected` → `Connected`. Resets telemetry and starts sampling.
    pub fn connect(&mut self) -> Result<(), ControllerError> {
        let (run, session_id, server_id) = {
            let mut session = self.session.lock();
            if session.is_connected() {
                return Err(ControllerError::InvalidTransition {
                    from: session.state,
                    action: "connect",
                });
            }
            let run = session.begin_run();
            (run, session.id.clone(), session.selected.id)
        };

        let shared = self.session.clone();
        let events = self.events.clone();
        self.telemetry.start(move |sample| {
            let mut session = shared.lock();
            if !session.apply(run, &sample) {
                return false;
            }
            let event = SessionEvent::tick(&session.id, session.elapsed_secs, &sample);
            drop(session);
            events.emit(&event);
            true
        });

        info!("Session {} connected to server {}", session_id, server_id);
        self.events.emit(&SessionEvent::StateChanged {
            session_id,
            state: ConnectionState::Connected,
            server_id: server_id.to_string(),
        });
        Ok(())
    }

    /// `Connected` → `Disconnected`. Stops sampling; last values stay in place.
    pub fn disconnect(&mut self) -> Result<(), ControllerError> {
        let (session_id, server_id, elapsed) = {
            let mut session = self.session.lock();
            if !session.is_connected() {
                return Err(ControllerError::InvalidTransition {
                    from: session.state,
                    action: "disconnect",
                });
            }
            session.end_run();
            (session.id.clone(), session.selected.id, session.elapsed_secs)
        };
        self.telemetry.stop();

        info!("Session {} disconnected after {}s", session_id, elapsed);
        self.events.emit(&SessionEvent::StateChanged {
            session_id,
            state: ConnectionState::Disconnected,
            server_id: server_id.to_string(),
        });
        Ok(())
    }

    /// Flip the connection state. Always succeeds; returns the new state.
    pub fn toggle(&mut self) -> ConnectionState {
        // Each branch runs from the state it just observed, so neither can fail.
        let result = match self.state() {
            ConnectionState::Disconnected => self.connect(),
            ConnectionState::Connected => self.disconnect(),
        };
        debug_assert!(result.is_ok());
        self.state()
    }

    /// Select the server with the given id, in any state.
    ///
    /// An unknown id is an error and leaves the selection unchanged.
    pub fn select_server(&mut self, id: &str) -> Result<&'static Server, ControllerError> {
        let server = self.directory.get(id)?;
        let session_id = {
            let mut session = self.session.lock();
            session.selected = server;
            session.id.clone()
        };

        debug!("Session {} selected server {} ({})", session_id, server.id, server.name);
        self.events.emit(&SessionEvent::ServerSelected {
            session_id,
            server_id: server.id.to_string(),
        });
        Ok(server)
    }

    /// Stop telemetry and close the session. Idempotent.
    pub fn teardown(&mut self) {
        self.telemetry.stop();
        let mut session = self.session.lock();
        if session.is_connected() {
            session.end_run();
            info!("Session {} torn down while connected", session.id);
        }
    }
}

impl Drop for ConnectionController {
    fn drop(&mut self) {
        self.teardown();
    }
}
