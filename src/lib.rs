//! SecureVPN - a simulated VPN client core
//!
//! Sign-in gate, static server catalog, connection state machine with
//! synthetic telemetry, and a local API endpoint. No real tunnel is built.

pub mod api;
pub mod auth;
pub mod config;
pub mod console;
pub mod events;
pub mod shell;
pub mod vpn;

use std::sync::Arc;

use api::ApiServer;
use auth::CommandProbe;
use config::{AppConfig, ConfigStorage};
use events::{event_names, HostEventBus};
use shell::SessionShell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging
fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config, falling back to defaults when it cannot be used
async fn load_config() -> AppConfig {
    let storage = match ConfigStorage::new() {
        Ok(storage) => storage,
        Err(e) => {
            tracing::warn!("No config location ({}), using defaults", e);
            return AppConfig::default();
        }
    };

    match storage.load().await {
        Ok(config) => {
            tracing::debug!("Config loaded from {:?}", storage.path());
            config
        }
        Err(e) => {
            tracing::error!("Failed to load config from {:?}: {}", storage.path(), e);
            AppConfig::default()
        }
    }
}

async fn run_app() {
    let config = load_config().await;
    let bus = HostEventBus::new();

    // Subscribe before the server announces itself
    let host_events = bus.subscribe(event_names::SERVER_STARTED);

    let api = if config.api.enabled {
        match ApiServer::start(config.api.port, &bus).await {
            Ok(server) => Some(server),
            Err(e) => {
                tracing::error!("{}; continuing without local API", e);
                None
            }
        }
    } else {
        tracing::info!("Local API disabled");
        None
    };

    let probe = Arc::new(CommandProbe::new(config.auth.cli_program.clone()));
    let mut shell = SessionShell::new(&config, probe, Some(bus.clone()));

    console::run_console(&mut shell, host_events).await;

    shell.logout();
    if let Some(api) = api {
        api.shutdown().await;
    }
    tracing::info!("SecureVPN stopped");
}

pub fn run() {
    init_logging();

    tracing::info!("Starting SecureVPN...");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return;
        }
    };

    runtime.block_on(run_app());
}
