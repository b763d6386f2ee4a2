//! Batteries API HTTP server
//!
//! # Architecture
//!
//! ```text
//! Dashboard (browser)
//!     ↓ HTTP / WebSocket
//! DashboardServer (this module)
//!     ↓ AppState::snapshot
//! ClusterReader  →  compose_snapshot
//!     ↓
//! Kubernetes API
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use batteries_api::server::{AppState, DashboardServer};
//!
//! let state = AppState::new(reader).push_interval(Duration::from_secs(5));
//! DashboardServer::new(config.server, state).run().await?;
//! ```

pub mod push;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{routing::get, Router};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::cluster::ClusterReader;
use crate::config::ServerConfig;
use crate::monitoring::QueryStats;
use crate::snapshot::{compose_snapshot, Clock, Snapshot, SystemClock};
use push::SnapshotSource;

/// Shared state handed to every handler.
///
/// Cloning is cheap; the reader and clock are reference counted.
#[derive(Clone)]
pub struct AppState {
    reader: Arc<ClusterReader>,
    clock: Arc<dyn Clock>,
    push_interval: Duration,
    max_live_services: usize,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(reader: Arc<ClusterReader>) -> Self {
        Self {
            reader,
            clock: Arc::new(SystemClock),
            push_interval: Duration::from_secs(5),
            max_live_services: 5,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn push_interval(mut self, interval: Duration) -> Self {
        self.push_interval = interval;
        self
    }

    pub fn max_live_services(mut self, max: usize) -> Self {
        self.max_live_services = max;
        self
    }

    /// Token cancelled on server shutdown; every push loop runs under a child.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn reader(&self) -> &ClusterReader {
        &self.reader
    }

    pub fn stats(&self) -> Arc<QueryStats> {
        self.reader.stats()
    }

    /// Read the cluster and compose one snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.reader.read().await;
        let mut rng = rand::rng();
        compose_snapshot(&state, self.clock.as_ref(), &mut rng)
    }
}

#[async_trait]
impl SnapshotSource for AppState {
    async fn next_snapshot(&self) -> Snapshot {
        self.snapshot().await
    }
}

/// Build the router with all endpoints and the CORS policy.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/dashboard", get(routes::dashboard))
        .route("/api/services", get(routes::services))
        .route("/api/databases", get(routes::databases))
        .route("/ws", get(routes::ws_handler))
        .route("/metrics", get(routes::metrics))
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, method and header; credentials allowed.
///
/// Origins, methods and headers are mirrored from the request because a
/// literal `*` is not valid together with credentials.
fn cors_layer() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// The batteries API server.
pub struct DashboardServer {
    config: ServerConfig,
    state: AppState,
}

impl DashboardServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Returns the address the server will listen on.
    pub fn addr(&self) -> String {
        self.config.addr()
    }

    /// Bind and serve until Ctrl-C or SIGTERM.
    ///
    /// Open WebSocket push loops are cancelled before the server returns.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr = self.addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Batteries API listening on http://{}", listener.local_addr()?);

        let shutdown = self.state.shutdown_token();
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await
    }
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received, closing connections");
    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::testing::{node, StaticSource};
    use crate::config::ServerConfig;
    use crate::snapshot::FixedClock;

    fn state() -> AppState {
        let source = StaticSource::new()
            .with_nodes(vec![node("a", &[("Ready", "True")])])
            .with_namespace("default", 2, 1);
        let reader = ClusterReader::new(Arc::new(source), Duration::from_secs(1));
        AppState::new(Arc::new(reader)).clock(Arc::new(FixedClock::epoch()))
    }

    #[test]
    fn test_server_addr() {
        let server = DashboardServer::new(ServerConfig::default(), state());
        assert_eq!(server.addr(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_state_snapshot_uses_reader_and_clock() {
        let snapshot = state().snapshot().await;
        assert_eq!(snapshot.cluster.nodes, 1);
        assert_eq!(snapshot.cluster.nodes_ready, 1);
        assert_eq!(snapshot.namespaces[0].pod_count, 2);
        assert_eq!(
            snapshot.alerts[0].timestamp,
            FixedClock::epoch().0 - chrono::TimeDelta::minutes(15)
        );
    }

    #[test]
    fn test_builder_settings() {
        let state = state()
            .push_interval(Duration::from_secs(2))
            .max_live_services(3);
        assert_eq!(state.push_interval, Duration::from_secs(2));
        assert_eq!(state.max_live_services, 3);
    }
}
