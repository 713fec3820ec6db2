//! Local HTTP endpoint
//!
//! Bound on localhost. Every request gets `200 OK` with a fixed plain-text
//! greeting.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{event_names, HostEventBus};

/// Body returned for every request
pub const GREETING: &str = "Hello dude";

/// How long `shutdown` waits for in-flight connections before aborting
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to bind API server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Payload of the `server-started` event
#[derive(Debug, Clone, Serialize)]
pub struct ServerStarted {
    pub port: u16,
}

fn router() -> Router {
    Router::new().fallback(|| async { GREETING })
}

/// Running API server
pub struct ApiServer {
    addr: SocketAddr,
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Bind on `127.0.0.1:port` (0 picks a free port), announce the bound
    /// port on the bus and start serving
    pub async fn start(port: u16, bus: &HostEventBus) -> Result<Self, ApiError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| ApiError::Bind { port, source })?;
        let addr = listener.local_addr().map_err(ApiError::LocalAddr)?;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router())
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                    debug!("API server: stop requested");
                })
                .await;
            if let Err(e) = served {
                warn!("API server on {} failed: {}", addr, e);
            }
        });

        info!("API server listening on {}", addr);
        bus.emit_json(event_names::SERVER_STARTED, &ServerStarted { port: addr.port() });

        Ok(Self {
            addr,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting and let open connections finish, falling back to
    /// abort after the grace period
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(_) => info!("API server on {} stopped", self.addr),
            Err(_) => {
                warn!(
                    "API server on {} did not stop within {:?}, aborting",
                    self.addr, SHUTDOWN_GRACE
                );
                handle.abort();
            }
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_responds_with_greeting() {
        let bus = HostEventBus::new();
        let server = ApiServer::start(0, &bus).await.unwrap();

        for path in ["/", "/status/anything"] {
            let response = get(server.local_addr(), path).await;
            assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
            assert!(response.ends_with("\r\n\r\nHello dude"));
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_announces_bound_port() {
        let bus = HostEventBus::new();
        let mut rx = bus.subscribe(event_names::SERVER_STARTED);

        let server = ApiServer::start(0, &bus).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload, serde_json::json!({ "port": server.port() }));
        assert_ne!(server.port(), 0);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let bus = HostEventBus::new();
        let server = ApiServer::start(0, &bus).await.unwrap();
        let addr = server.local_addr();

        server.shutdown().await;
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_keepalive_connection() {
        let bus = HostEventBus::new();
        let server = ApiServer::start(0, &bus).await.unwrap();

        let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !String::from_utf8_lossy(&received).ends_with(GREETING) {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the response");
            received.extend_from_slice(&buf[..n]);
        }

        // The open keep-alive connection does not hold shutdown to the grace period
        let started = std::time::Instant::now();
        server.shutdown().await;
        assert!(started.elapsed() < SHUTDOWN_GRACE);

        assert_eq!(stream.read(&mut buf).await.unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let bus = HostEventBus::new();
        let first = ApiServer::start(0, &bus).await.unwrap();

        let err = ApiServer::start(first.port(), &bus).await.err().unwrap();
        assert!(matches!(err, ApiError::Bind { .. }));

        first.shutdown().await;
    }
}
