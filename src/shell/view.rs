//! View models handed to the presentation layer

use serde::Serialize;

use crate::auth::{Identity, PrerequisiteStatus};
use crate::vpn::{
    format_elapsed, ConnectionController, ConnectionState, LoadLevel, PingQuality, Server,
};

/// Format a synthetic rate for display, e.g. "42.3 MB/s"
pub fn format_rate(rate: f64) -> String {
    format!("{:.1} MB/s", rate)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerView {
    #[serde(flatten)]
    pub server: &'static Server,
    pub ping_quality: PingQuality,
    pub load_level: LoadLevel,
    pub selected: bool,
}

impl ServerView {
    fn new(server: &'static Server, selected: &Server) -> Self {
        Self {
            server,
            ping_quality: server.ping_quality(),
            load_level: server.load_level(),
            selected: server.id == selected.id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginView {
    /// Submit control disabled while true
    pub busy: bool,
    pub prerequisite: PrerequisiteStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub user: String,
    pub state: ConnectionState,
    pub status_line: &'static str,
    pub toggle_label: &'static str,
    /// "New York, United States" while connected
    pub connected_to: Option<String>,
    pub selected_server: ServerView,
    /// `HH:MM:SS`
    pub elapsed: String,
    pub elapsed_secs: u64,
    pub download_rate: f64,
    pub upload_rate: f64,
    pub servers: Vec<ServerView>,
}

impl DashboardView {
    pub fn build(identity: &Identity, controller: &ConnectionController) -> Self {
        let session = controller.session();
        let selected = session.selected;
        Self {
            user: identity.display_name().to_string(),
            state: session.state,
            status_line: session.state.status_line(),
            toggle_label: session.state.toggle_label(),
            connected_to: session.is_connected().then(|| selected.display_name()),
            selected_server: ServerView::new(selected, selected),
            elapsed: format_elapsed(session.elapsed_secs),
            elapsed_secs: session.elapsed_secs,
            download_rate: session.download_rate,
            upload_rate: session.upload_rate,
            servers: controller
                .directory()
                .list()
                .iter()
                .map(|s| ServerView::new(s, selected))
                .collect(),
        }
    }
}

/// What the presentation layer should show
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "screen", rename_all = "camelCase")]
pub enum ShellView {
    Login(LoginView),
    Dashboard(DashboardView),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SessionEventEmitter;
    use crate::vpn::{ServerDirectory, TelemetryConfig};

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0), "0.0 MB/s");
        assert_eq!(format_rate(42.345), "42.3 MB/s");
    }

    #[tokio::test]
    async fn test_dashboard_view() {
        let mut controller = ConnectionController::new(
            ServerDirectory::builtin(),
            TelemetryConfig::default(),
            SessionEventEmitter::noop(),
        );
        controller.select_server("2").unwrap();
        let identity = Identity::new("user@example.com");

        let view = DashboardView::build(&identity, &controller);
        assert_eq!(view.user, "user@example.com");
        assert_eq!(view.status_line, "Disconnected");
        assert_eq!(view.toggle_label, "Connect");
        assert_eq!(view.connected_to, None);
        assert_eq!(view.elapsed, "00:00:00");
        assert_eq!(view.selected_server.server.name, "London");
        assert_eq!(view.servers.len(), 8);
        assert_eq!(view.servers.iter().filter(|s| s.selected).count(), 1);
        assert!(view.servers[1].selected);

        controller.connect().unwrap();
        let view = DashboardView::build(&identity, &controller);
        assert_eq!(view.status_line, "Protected");
        assert_eq!(view.toggle_label, "Disconnect");
        assert_eq!(view.connected_to.as_deref(), Some("London, United Kingdom"));
    }

    #[tokio::test]
    async fn test_view_serialization() {
        let controller = ConnectionController::new(
            ServerDirectory::builtin(),
            TelemetryConfig::default(),
            SessionEventEmitter::noop(),
        );
        let identity = Identity::new("user@example.com");
        let view = ShellView::Dashboard(DashboardView::build(&identity, &controller));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["screen"], "dashboard");
        assert_eq!(json["state"], "disconnected");
        assert_eq!(json["selectedServer"]["id"], "1");
        assert_eq!(json["selectedServer"]["pingQuality"], "good");
        assert_eq!(json["servers"][4]["location"], "SYD");
    }
}
