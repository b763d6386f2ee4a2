//! Per-connection snapshot push loop.
//!
//! ```text
//! Connected -> Waiting --tick--> Composing -> Sending --ok--> Waiting
//!                 |                  |            |
//!                 +--- cancelled ----+-- cancelled+-- send failed
//!                          |                              |
//!                          v                              v
//!                       Closed <--------------------------+
//! ```
//!
//! Cancellation is observed in every state, including while a send is
//! blocked on a client that stopped reading.
//!
//! The loop is strictly single flight: a slow composition delays the next
//! tick instead of queueing it, and missed ticks are never replayed in a
//! burst.

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::snapshot::Snapshot;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection send failed: {0}")]
    Send(String),

    #[error("Connection close failed: {0}")]
    Close(String),
}

/// Produces one snapshot per tick.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn next_snapshot(&self) -> Snapshot;
}

/// The outbound half of a streaming connection.
#[async_trait]
pub trait SnapshotSink: Send {
    /// Deliver one serialized snapshot.
    async fn send(&mut self, payload: String) -> Result<(), PushError>;

    /// Flush and close the connection.
    async fn close(&mut self) -> Result<(), PushError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    Connected,
    Waiting,
    Composing,
    Sending,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    SendFailed,
    Cancelled,
}

/// Upper bound on flushing and closing a cancelled connection.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a finished push loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushReport {
    pub sent: usize,
    pub reason: CloseReason,
    /// State the loop was in when it stopped.
    pub closed_from: PushState,
}

pub struct PushLoop<Src, Snk> {
    source: Src,
    sink: Snk,
    interval: Duration,
    state: PushState,
    sent: usize,
}

impl<Src, Snk> PushLoop<Src, Snk>
where
    Src: SnapshotSource,
    Snk: SnapshotSink,
{
    pub fn new(source: Src, sink: Snk, interval: Duration) -> Self {
        Self {
            source,
            sink,
            interval,
            state: PushState::Connected,
            sent: 0,
        }
    }

    /// Run until a send fails or `cancel` fires.
    ///
    /// `cancel` is watched in every state, a blocked send included. On
    /// cancellation the sink is closed within [`CLOSE_TIMEOUT`]; on send
    /// failure it is dropped.
    pub async fn run(mut self, cancel: CancellationToken) -> PushReport {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            self.transition(PushState::Waiting);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break CloseReason::Cancelled,
                _ = ticker.tick() => {}
            }

            self.transition(PushState::Composing);
            let snapshot = tokio::select! {
                biased;
                _ = cancel.cancelled() => break CloseReason::Cancelled,
                snapshot = self.source.next_snapshot() => snapshot,
            };

            self.transition(PushState::Sending);
            let payload = match serde_json::to_string(&snapshot) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize snapshot, skipping tick");
                    continue;
                }
            };

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break CloseReason::Cancelled,
                sent = self.sink.send(payload) => sent,
            };
            if let Err(e) = sent {
                warn!(error = %e, sent = self.sent, "WebSocket send failed, closing connection");
                break CloseReason::SendFailed;
            }
            self.sent += 1;
        };

        let closed_from = self.state;
        if reason == CloseReason::Cancelled {
            match tokio::time::timeout(CLOSE_TIMEOUT, self.sink.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "Error while closing WebSocket"),
                Err(_) => debug!("WebSocket close timed out, dropping connection"),
            }
        }
        self.transition(PushState::Closed);

        PushReport {
            sent: self.sent,
            reason,
            closed_from,
        }
    }

    fn transition(&mut self, next: PushState) {
        trace!(from = ?self.state, to = ?next, "push loop transition");
        self.state = next;
    }
}

/// [`SnapshotSink`] over the write half of an axum WebSocket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SnapshotSink for WsSink {
    async fn send(&mut self, payload: String) -> Result<(), PushError> {
        self.inner
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| PushError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), PushError> {
        self.inner
            .close()
            .await
            .map_err(|e| PushError::Close(e.to_string()))
    }
}
