use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::Node;
use tracing::warn;

use super::{ClusterError, ClusterSource, ClusterState, NamespaceCounts, Query, ServiceRef};
use crate::monitoring::QueryStats;

/// Per-namespace queries allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 4;

/// Best-effort fan-out over a [`ClusterSource`].
pub struct ClusterReader {
    source: Arc<dyn ClusterSource>,
    timeout: Duration,
    max_concurrent: usize,
    stats: Arc<QueryStats>,
}

impl ClusterReader {
    pub fn new(source: Arc<dyn ClusterSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            max_concurrent: DEFAULT_MAX_CONCURRENT_QUERIES,
            stats: Arc::new(QueryStats::new()),
        }
    }

    /// Cap the pod and service queries issued concurrently by [`read`](Self::read).
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit.max(1);
        self
    }

    pub fn stats(&self) -> Arc<QueryStats> {
        Arc::clone(&self.stats)
    }

    /// Query nodes, namespaces and per-namespace pod/service counts.
    ///
    /// Never fails: each query that errors or exceeds the deadline counts as
    /// zero items.
    pub async fn read(&self) -> ClusterState {
        let (nodes, namespaces) = tokio::join!(
            self.query(Query::Nodes, self.source.list_nodes()),
            self.query(Query::Namespaces, self.source.list_namespaces()),
        );

        let nodes_ready = nodes.iter().filter(|n| node_is_ready(n)).count();

        // Pod and service counts for every namespace, at most
        // `max_concurrent` in flight, results in namespace order.
        let counts: Vec<usize> = stream::iter(namespaces.iter().flat_map(|name| {
            [(Query::Pods, name.as_str()), (Query::Services, name.as_str())]
        }))
        .map(|(query, name)| async move {
            match query {
                Query::Pods => self.query(query, self.source.count_pods(name)).await,
                _ => self.query(query, self.source.count_services(name)).await,
            }
        })
        .buffered(self.max_concurrent)
        .boxed()
        .collect()
        .await;

        let namespaces = namespaces
            .into_iter()
            .zip(counts.chunks(2))
            .map(|(name, pair)| NamespaceCounts {
                name,
                pod_count: pair[0],
                service_count: pair[1],
            })
            .collect();

        ClusterState {
            nodes: nodes.len(),
            nodes_ready,
            namespaces,
        }
    }

    /// Up to `limit` services across all namespaces, in API order.
    pub async fn live_services(&self, limit: usize) -> Vec<ServiceRef> {
        let mut services = self
            .query(Query::AllServices, self.source.list_services())
            .await;
        services.truncate(limit);
        services
    }

    async fn query<T, F>(&self, query: Query, fut: F) -> T
    where
        T: Default,
        F: Future<Output = Result<T, ClusterError>>,
    {
        best_effort(query, self.timeout, &self.stats, fut).await
    }
}

/// Run one cluster query under a deadline, substituting `T::default()` on
/// failure.
///
/// Every attempt and every failure is counted in `stats`; failures are also
/// logged at warn.
pub async fn best_effort<T, F>(query: Query, timeout: Duration, stats: &QueryStats, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, ClusterError>>,
{
    stats.record_attempt(query);

    let outcome = match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClusterError::Timeout { query, timeout }),
    };

    match outcome {
        Ok(value) => value,
        Err(e) => {
            stats.record_failure(query);
            warn!(query = %query, error = %e, "cluster query failed, using empty result");
            T::default()
        }
    }
}

/// A node is ready iff it reports a `Ready` condition with status `True`.
pub fn node_is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}
