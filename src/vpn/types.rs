//! Connection session types

use serde::{Deserialize, Serialize};

use super::directory::Server;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    /// Headline shown on the dashboard
    pub fn status_line(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "Protected",
            ConnectionState::Disconnected => "Disconnected",
        }
    }

    /// Label for the toggle control
    pub fn toggle_label(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "Disconnect",
            ConnectionState::Disconnected => "Connect",
        }
    }
}

/// One synthetic telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// 1-based tick number within the current run
    pub tick: u64,
    /// MB/s
    pub download_rate: f64,
    /// MB/s
    pub upload_rate: f64,
}

/// Mutable connection state owned by the controller.
///
/// `run` identifies the telemetry run allowed to write into this session.
/// It changes on every connect and disconnect, so a sample produced by a
/// stopped run is rejected even if its task has not been torn down yet.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub state: ConnectionState,
    pub selected: &'static Server,
    pub elapsed_secs: u64,
    pub download_rate: f64,
    pub upload_rate: f64,
    run: u64,
}

impl Session {
    pub fn new(selected: &'static Server) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: ConnectionState::Disconnected,
            selected,
            elapsed_secs: 0,
            download_rate: 0.0,
            upload_rate: 0.0,
            run: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Enter `Connected` with zeroed telemetry; returns the new run id
    pub(crate) fn begin_run(&mut self) -> u64 {
        self.state = ConnectionState::Connected;
        self.elapsed_secs = 0;
        self.download_rate = 0.0;
        self.upload_rate = 0.0;
        self.run += 1;
        self.run
    }

    /// Enter `Disconnected`, keeping the last observed values
    pub(crate) fn end_run(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.run += 1;
    }

    /// Apply a sample from run `run`. Returns false if the run is stale.
    pub(crate) fn apply(&mut self, run: u64, sample: &TelemetrySample) -> bool {
        if run != self.run || !self.is_connected() {
            return false;
        }
        self.elapsed_secs += 1;
        self.download_rate = sample.download_rate;
        self.upload_rate = sample.upload_rate;
        true
    }
}

/// Format a second count as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_elapsed(seconds: u64) -> String {
    let hrs = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hrs, mins, secs)
}
