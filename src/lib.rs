//! # Batteries API
//!
//! A status-aggregation backend for the Batteries dashboard. It polls a
//! Kubernetes cluster for nodes, namespaces, pods and services, composes
//! them with simulated metrics into a dashboard snapshot, and serves that
//! snapshot over HTTP and as a periodic WebSocket push.
//!
//! ## Features
//!
//! - **Best-effort reads**: a failed or slow cluster query degrades to an
//!   empty result instead of failing the request
//! - **Deterministic composition**: clock and randomness are injected, so a
//!   snapshot is reproducible in tests
//! - **Push loop**: one task per WebSocket connection, closed on send failure,
//!   client disconnect or server shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use batteries_api::cluster::{ClusterReader, KubeClusterSource};
//! use batteries_api::server::{AppState, DashboardServer};
//! use batteries_api::config::ServerConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = KubeClusterSource::connect(None).await?;
//! let reader = ClusterReader::new(Arc::new(source), Duration::from_secs(10));
//! let state = AppState::new(Arc::new(reader));
//! DashboardServer::new(ServerConfig::default(), state).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod server;
pub mod snapshot;

use std::sync::Arc;

pub use cluster::{ClusterReader, ClusterState, KubeClusterSource};
pub use error::{ApiError, Result};
pub use snapshot::Snapshot;

use cli::{Cli, Commands};
use config::Config;
use server::{AppState, DashboardServer};
use snapshot::{compose_snapshot, SystemClock};

/// The current version of the server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve configuration, connect to the cluster and run the chosen command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;

    // Install rustls crypto provider (required for TLS connections to K8s API)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let reader = Arc::new(connect_reader(&config).await?);

    match cli.command() {
        Commands::Serve { .. } => {
            let state = AppState::new(reader)
                .push_interval(config.push.interval())
                .max_live_services(config.services.max_live);
            DashboardServer::new(config.server.clone(), state).run().await?;
        }
        Commands::Snapshot { compact } => {
            let state = reader.read().await;
            let snapshot = compose_snapshot(&state, &SystemClock, &mut rand::rng());
            let json = if compact {
                serde_json::to_string(&snapshot)?
            } else {
                serde_json::to_string_pretty(&snapshot)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}

async fn connect_reader(config: &Config) -> Result<ClusterReader> {
    let source = KubeClusterSource::connect(config.cluster.kubeconfig.as_deref()).await?;
    log::debug!(
        "Cluster client ready, per-query timeout {}s, {} concurrent queries",
        config.cluster.request_timeout_secs,
        config.cluster.max_concurrent_queries
    );
    Ok(
        ClusterReader::new(Arc::new(source), config.cluster.request_timeout())
            .with_max_concurrent(config.cluster.max_concurrent_queries),
    )
}
