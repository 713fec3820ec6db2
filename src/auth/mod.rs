//! Authentication Module
//!
//! Login gate in front of the dashboard:
//! - Simulated credential submission with a fixed delay
//! - One-shot VPN CLI availability check (fail-closed)
//! - Cancellable pending submission

pub mod gate;
pub mod probe;
pub mod types;

pub use gate::AuthGate;
pub use probe::{CliProbe, CommandProbe, ProbeError, StaticProbe};
pub use types::{is_email_shaped, AuthError, Identity, PrerequisiteStatus};
