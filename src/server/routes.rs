//! HTTP routes for the batteries API
//!
//! - `/api/health` - liveness
//! - `/api/dashboard` - full snapshot
//! - `/api/services` - service list
//! - `/api/databases` - database list
//! - `/ws` - snapshot push over WebSocket
//! - `/metrics` - cluster query counters

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::push::{PushLoop, WsSink};
use super::AppState;
use crate::monitoring::exposition::render_prometheus;
use crate::snapshot::{compose_databases, compose_services, DatabaseMetrics, ServiceMetrics, Snapshot};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// Full dashboard snapshot.
pub async fn dashboard(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.snapshot().await)
}

/// Sample services plus a few live ones from the cluster.
pub async fn services(State(state): State<AppState>) -> Json<Vec<ServiceMetrics>> {
    let live = state.reader().live_services(state.max_live_services).await;
    let mut rng = rand::rng();
    Json(compose_services(&live, state.max_live_services, &mut rng))
}

/// Simulated database fleet.
pub async fn databases() -> Json<Vec<DatabaseMetrics>> {
    let mut rng = rand::rng();
    Json(compose_databases(&mut rng))
}

/// Prometheus text exposition of the cluster query counters.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_prometheus(&state.stats()),
    )
}

/// WebSocket endpoint pushing a snapshot every interval.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_failed_upgrade(|e| warn!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Runs the push loop for one connection.
///
/// The read half is drained only to notice the client going away; its
/// messages are ignored.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    let cancel = state.shutdown_token().child_token();

    let watcher = tokio::spawn(watch_inbound(receiver, cancel.clone()));

    info!("WebSocket client connected");
    let interval = state.push_interval;
    let report = PushLoop::new(state, WsSink::new(sender), interval)
        .run(cancel.clone())
        .await;

    cancel.cancel();
    watcher.abort();
    info!(
        sent = report.sent,
        reason = ?report.reason,
        closed_from = ?report.closed_from,
        "WebSocket client disconnected"
    );
}

/// Drain client messages until a Close frame, a read error or the end of the
/// stream, then cancel the connection's push loop.
async fn watch_inbound<S>(mut inbound: S, cancel: CancellationToken)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg) = inbound.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => debug!("Ignoring inbound WebSocket message"),
            Err(e) => {
                debug!("WebSocket read error: {}", e);
                break;
            }
        }
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = health().await;
        assert_eq!(response.0.status, "healthy");
    }

    #[tokio::test]
    async fn test_close_frame_cancels_push() {
        let cancel = CancellationToken::new();
        let inbound = futures_util::stream::iter(vec![
            Ok(Message::Text("hello".into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("after close".into())),
        ]);
        let mut inbound = inbound.fuse();

        watch_inbound(&mut inbound, cancel.clone()).await;

        assert!(cancel.is_cancelled());
        // Frames after Close are left unread.
        assert!(inbound.next().await.is_some());
    }

    #[tokio::test]
    async fn test_disconnect_cancels_push() {
        let cancel = CancellationToken::new();
        watch_inbound(
            futures_util::stream::empty::<Result<Message, axum::Error>>(),
            cancel.clone(),
        ).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_read_error_cancels_push() {
        let cancel = CancellationToken::new();
        let inbound = futures_util::stream::iter(vec![Err(axum::Error::new(std::io::Error::other(
            "connection reset",
        )))]);
        watch_inbound(inbound, cancel.clone()).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_client_messages_do_not_cancel() {
        let cancel = CancellationToken::new();
        let inbound = futures_util::stream::iter(vec![Ok(Message::Text("ping".into()))])
            .chain(futures_util::stream::pending());

        let watched = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            watch_inbound(inbound, cancel.clone()),
        )
        .await;

        assert!(watched.is_err());
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_databases_endpoint() {
        let response = databases().await;
        assert_eq!(response.0.len(), 3);
    }
}
