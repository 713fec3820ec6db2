//! Session Shell
//!
//! Composition root: hands the identity produced by the authentication gate
//! to a fresh connection controller, and tears both down on logout.

pub mod view;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{AuthError, AuthGate, CliProbe, Identity};
use crate::config::{AppConfig, AuthSettings};
use crate::events::{HostEventBus, SessionEventEmitter};
use crate::vpn::{
    ConnectionController, ConnectionState, ControllerError, Server, ServerDirectory,
    TelemetryConfig,
};

pub use view::{format_rate, DashboardView, LoginView, ServerView, ShellView};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    #[error("Not signed in")]
    NotLoggedIn,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Controller(#[from] ControllerError),
}

impl serde::Serialize for ShellError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Signed-in state: identity plus the controller bound to it
struct ActiveSession {
    identity: Identity,
    controller: ConnectionController,
}

pub struct SessionShell {
    probe: Arc<dyn CliProbe>,
    auth: AuthSettings,
    telemetry: TelemetryConfig,
    directory: ServerDirectory,
    events: SessionEventEmitter,
    gate: Arc<AuthGate>,
    active: Option<ActiveSession>,
}

impl SessionShell {
    pub fn new(config: &AppConfig, probe: Arc<dyn CliProbe>, bus: Option<HostEventBus>) -> Self {
        let gate = Arc::new(AuthGate::new(probe.clone(), &config.auth));
        Self {
            probe,
            auth: config.auth.clone(),
            telemetry: TelemetryConfig::from(&config.telemetry),
            directory: ServerDirectory::builtin(),
            events: bus.map(SessionEventEmitter::new).unwrap_or_default(),
            gate,
            active: None,
        }
    }

    /// Current gate. A pending submission can be cancelled through it.
    pub fn gate(&self) -> Arc<AuthGate> {
        self.gate.clone()
    }

    pub async fn check_prerequisite(&self) -> bool {
        self.gate.check_prerequisite().await
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.active.as_ref().map(|a| &a.identity)
    }

    pub fn is_logged_in(&self) -> bool {
        self.active.is_some()
    }

    pub fn controller(&self) -> Option<&ConnectionController> {
        self.active.as_ref().map(|a| &a.controller)
    }

    fn controller_mut(&mut self) -> Result<&mut ConnectionController, ShellError> {
        self.active
            .as_mut()
            .map(|a| &mut a.controller)
            .ok_or(ShellError::NotLoggedIn)
    }

    /// Sign in and open a new session. An existing session is closed first.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&Identity, ShellError> {
        if self.active.is_some() {
            self.logout();
        }
        if self.gate.is_torn_down() {
            debug!("Authentication gate was torn down, starting a new one");
            self.renew_gate();
        }

        let gate = self.gate.clone();
        let identity = gate.submit(email, password).await?;

        info!("Opening session for {}", identity.email);
        let controller = ConnectionController::new(
            self.directory,
            self.telemetry.clone(),
            self.events.clone(),
        );
        let active = self.active.insert(ActiveSession {
            identity,
            controller,
        });
        Ok(&active.identity)
    }

    /// Close the session: stop telemetry, drop the identity and start a new
    /// gate activation. No-op when signed out.
    pub fn logout(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.controller.teardown();
        info!("Signed out {}", active.identity.email);

        self.gate.teardown();
        self.renew_gate();
    }

    fn renew_gate(&mut self) {
        self.gate = Arc::new(AuthGate::new(self.probe.clone(), &self.auth));
    }

    pub fn toggle(&mut self) -> Result<ConnectionState, ShellError> {
        Ok(self.controller_mut()?.toggle())
    }

    pub fn connect(&mut self) -> Result<(), ShellError> {
        Ok(self.controller_mut()?.connect()?)
    }

    pub fn disconnect(&mut self) -> Result<(), ShellError> {
        Ok(self.controller_mut()?.disconnect()?)
    }

    pub fn select_server(&mut self, id: &str) -> Result<&'static Server, ShellError> {
        Ok(self.controller_mut()?.select_server(id)?)
    }

    pub fn servers(&self) -> &'static [Server] {
        self.directory.list()
    }

    pub fn view(&self) -> ShellView {
        match &self.active {
            Some(active) => {
                ShellView::Dashboard(DashboardView::build(&active.identity, &active.controller))
            }
            None => ShellView::Login(LoginView {
                busy: self.gate.is_busy(),
                prerequisite: self.gate.prerequisite_status(),
            }),
        }
    }
}

impl Drop for SessionShell {
    fn drop(&mut self) {
        self.gate.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PrerequisiteStatus, ProbeError, StaticProbe};
    use crate::events::event_names;
    use crate::vpn::DirectoryError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct BrokenProbe;

    #[async_trait]
    impl CliProbe for BrokenProbe {
        async fn is_available(&self) -> Result<bool, ProbeError> {
            Err(ProbeError::Unavailable("bridge crashed".to_string()))
        }
    }

    fn shell() -> SessionShell {
        SessionShell::new(&AppConfig::default(), Arc::new(StaticProbe(true)), None)
    }

    #[tokio::test]
    async fn test_requires_login() {
        let mut shell = shell();
        assert!(!shell.is_logged_in());
        assert_eq!(shell.toggle(), Err(ShellError::NotLoggedIn));
        assert_eq!(shell.select_server("2").unwrap_err(), ShellError::NotLoggedIn);
        assert!(matches!(shell.view(), ShellView::Login(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_opens_dashboard() {
        let mut shell = shell();
        let identity = shell.login("user@example.com", "pw").await.unwrap();
        assert_eq!(identity.email, "user@example.com");

        match shell.view() {
            ShellView::Dashboard(view) => {
                assert_eq!(view.user, "user@example.com");
                assert_eq!(view.state, ConnectionState::Disconnected);
                assert_eq!(view.selected_server.server.id, "1");
            }
            other => panic!("expected dashboard, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_does_not_reach_shell() {
        let mut shell = SessionShell::new(&AppConfig::default(), Arc::new(BrokenProbe), None);
        assert!(!shell.check_prerequisite().await);
        match shell.view() {
            ShellView::Login(view) => {
                assert!(matches!(view.prerequisite, PrerequisiteStatus::Missing { .. }))
            }
            other => panic!("expected login, got {:?}", other),
        }

        // Advisory only: sign-in still works
        assert!(shell.login("user@example.com", "pw").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_tears_down_session() {
        let bus = HostEventBus::new();
        let mut ticks = bus.subscribe(event_names::SESSION_EVENT);
        let mut shell =
            SessionShell::new(&AppConfig::default(), Arc::new(StaticProbe(true)), Some(bus));
        shell.login("user@example.com", "pw").await.unwrap();
        assert_eq!(shell.toggle(), Ok(ConnectionState::Connected));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(shell.controller().unwrap().session().elapsed_secs, 2);
        assert_eq!(shell.controller().unwrap().live_timers(), 1);

        let old_gate = shell.gate();
        shell.logout();
        while ticks.try_recv().is_ok() {}

        // Telemetry stopped with the session: nothing arrives afterwards
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(ticks.try_recv().is_err());

        assert!(!shell.is_logged_in());
        assert!(shell.identity().is_none());
        assert!(old_gate.is_torn_down());
        assert!(!shell.gate().is_torn_down());
        assert_eq!(shell.gate().prerequisite_status(), PrerequisiteStatus::Unknown);

        // A new login starts from a clean, disconnected session
        shell.login("other@example.com", "pw").await.unwrap();
        let session = shell.controller().unwrap().session();
        assert_eq!(session.state, ConnectionState::Disconnected);
        assert_eq!(session.elapsed_secs, 0);
        assert_eq!(shell.identity().unwrap().email, "other@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_after_cancelled_submission() {
        let mut shell = shell();
        let gate = shell.gate();
        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            gate.teardown();
        });

        assert_eq!(
            shell.login("user@example.com", "pw").await.unwrap_err(),
            ShellError::Auth(AuthError::Cancelled)
        );
        cancel.await.unwrap();
        assert!(!shell.is_logged_in());

        // The cancelled gate is replaced on the next attempt
        let identity = shell.login("user@example.com", "pw").await.unwrap();
        assert_eq!(identity.email, "user@example.com");
        assert!(!shell.gate().is_torn_down());
        assert!(shell.login("other@example.com", "pw").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_unknown_server_propagates() {
        let mut shell = shell();
        shell.login("user@example.com", "pw").await.unwrap();
        assert_eq!(
            shell.select_server("99").unwrap_err(),
            ShellError::Controller(ControllerError::Directory(DirectoryError::NotFound(
                "99".to_string()
            )))
        );
        assert_eq!(shell.select_server("7").unwrap().name, "Singapore");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_login_keeps_login_screen() {
        let mut shell = shell();
        assert_eq!(
            shell.login("nope", "pw").await.unwrap_err(),
            ShellError::Auth(AuthError::InvalidEmail)
        );
        assert!(!shell.is_logged_in());
    }
}
