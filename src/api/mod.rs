//! Local API Module
//!
//! HTTP endpoint started alongside the UI. It announces itself with the
//! `server-started` host event.

pub mod server;

pub use server::{ApiError, ApiServer, ServerStarted, GREETING};
