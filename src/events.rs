//! Host Event Channel
//!
//! Subscribe-by-name delivery of out-of-band events (e.g. "server-started")
//! from the host process to the view. Payloads are opaque JSON.
//!
//! Each event name gets its own broadcast channel, created on first use.
//! Emitting an event nobody listens to is not an error.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::vpn::{ConnectionState, TelemetrySample};

/// Per-name channel capacity. Slow subscribers lag rather than block emitters.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub mod event_names {
    /// Local API server is accepting requests
    pub const SERVER_STARTED: &str = "server-started";
    /// Connection controller state change or telemetry tick
    pub const SESSION_EVENT: &str = "session-event";
}

/// One delivered event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    pub name: String,
    pub payload: Value,
}

/// Named event bus shared between the host process and the view
#[derive(Clone, Default)]
pub struct HostEventBus {
    channels: Arc<DashMap<String, broadcast::Sender<HostEvent>>>,
}

impl HostEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, name: &str) -> broadcast::Sender<HostEvent> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribe to events with the given name
    pub fn subscribe(&self, name: &str) -> broadcast::Receiver<HostEvent> {
        debug!("HostEventBus: subscribe {}", name);
        self.sender(name).subscribe()
    }

    /// Emit an event; returns the number of subscribers reached
    pub fn emit(&self, name: &str, payload: Value) -> usize {
        let event = HostEvent {
            name: name.to_string(),
            payload,
        };
        self.sender(name).send(event).unwrap_or(0)
    }

    /// Serialize and emit a typed payload
    pub fn emit_json<T: Serialize>(&self, name: &str, payload: &T) -> usize {
        match serde_json::to_value(payload) {
            Ok(value) => self.emit(name, value),
            Err(e) => {
                warn!("Failed to serialize {} payload: {}", name, e);
                0
            }
        }
    }
}

/// Session events published by the connection controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged {
        session_id: String,
        state: ConnectionState,
        server_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ServerSelected { session_id: String, server_id: String },
    #[serde(rename_all = "camelCase")]
    TelemetryTick {
        session_id: String,
        elapsed_secs: u64,
        download_rate: f64,
        upload_rate: f64,
    },
}

impl SessionEvent {
    pub fn tick(session_id: &str, elapsed_secs: u64, sample: &TelemetrySample) -> Self {
        Self::TelemetryTick {
            session_id: session_id.to_string(),
            elapsed_secs,
            download_rate: sample.download_rate,
            upload_rate: sample.upload_rate,
        }
    }
}

/// Emitter for session events.
///
/// Can be a no-op for tests or when no view is attached.
#[derive(Clone, Default)]
pub struct SessionEventEmitter {
    bus: Option<HostEventBus>,
}

impl SessionEventEmitter {
    pub fn new(bus: HostEventBus) -> Self {
        Self { bus: Some(bus) }
    }

    /// Create a no-op emitter
    pub fn noop() -> Self {
        Self { bus: None }
    }

    pub fn emit(&self, event: &SessionEvent) {
        if let Some(ref bus) = self.bus {
            bus.emit_json(event_names::SESSION_EVENT, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribe_by_name() {
        let bus = HostEventBus::new();
        let mut started = bus.subscribe(event_names::SERVER_STARTED);
        let mut other = bus.subscribe("other");

        assert_eq!(bus.emit(event_names::SERVER_STARTED, json!({ "port": 8888 })), 1);

        let event = started.recv().await.unwrap();
        assert_eq!(event.name, "server-started");
        assert_eq!(event.payload["port"], 8888);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = HostEventBus::new();
        assert_eq!(bus.emit("nobody-listens", Value::Null), 0);
    }

    #[tokio::test]
    async fn test_session_event_payload_shape() {
        let bus = HostEventBus::new();
        let mut rx = bus.subscribe(event_names::SESSION_EVENT);
        let emitter = SessionEventEmitter::new(bus);

        emitter.emit(&SessionEvent::StateChanged {
            session_id: "s1".to_string(),
            state: ConnectionState::Connected,
            server_id: "1".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event.payload,
            json!({
                "type": "stateChanged",
                "sessionId": "s1",
                "state": "connected",
                "serverId": "1",
            })
        );

        let decoded: SessionEvent = serde_json::from_value(event.payload).unwrap();
        assert!(matches!(decoded, SessionEvent::StateChanged { .. }));
    }

    #[test]
    fn test_noop_emitter() {
        SessionEventEmitter::noop().emit(&SessionEvent::ServerSelected {
            session_id: "s1".to_string(),
            server_id: "2".to_string(),
        });
    }
}
