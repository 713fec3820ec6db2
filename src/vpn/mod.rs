//! VPN Session Module
//!
//! Simulated connection handling for the dashboard:
//! - Static server directory
//! - Connect/disconnect state machine with server selection
//! - Synthetic throughput telemetry while connected

pub mod controller;
pub mod directory;
pub mod telemetry;
pub mod types;

pub use controller::{ConnectionController, ControllerError};
pub use directory::{
    DirectoryError, LoadLevel, PingQuality, Server, ServerDirectory, BUILTIN_SERVERS,
};
pub use telemetry::{TelemetryConfig, TelemetrySimulator};
pub use types::{format_elapsed, ConnectionState, Session, TelemetrySample};
