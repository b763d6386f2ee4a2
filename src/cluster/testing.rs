//! In-memory [`ClusterSource`] for tests and local development.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeCondition, NodeStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::{ClusterError, ClusterSource, Query, ServiceRef};

/// Build a node carrying the given `(type, status)` conditions.
pub fn node(name: &str, conditions: &[(&str, &str)]) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(NodeStatus {
            conditions: Some(
                conditions
                    .iter()
                    .map(|(type_, status)| NodeCondition {
                        type_: type_.to_string(),
                        status: status.to_string(),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Fixed cluster contents with optional injected failures and delays.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    nodes: Vec<Node>,
    namespaces: Vec<(String, usize, usize)>,
    services: Vec<ServiceRef>,
    failing: HashSet<Query>,
    delays: HashMap<Query, Duration>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_namespace(mut self, name: &str, pods: usize, services: usize) -> Self {
        self.namespaces.push((name.to_string(), pods, services));
        self
    }

    pub fn with_service(mut self, namespace: &str, name: &str) -> Self {
        self.services.push(ServiceRef::new(namespace, name));
        self
    }

    /// Make every call of `query` fail.
    pub fn failing(mut self, query: Query) -> Self {
        self.failing.insert(query);
        self
    }

    /// Delay every call of `query` by `delay` before answering.
    pub fn with_delay(mut self, query: Query, delay: Duration) -> Self {
        self.delays.insert(query, delay);
        self
    }

    /// Highest number of calls seen in flight at once, shared across clones.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn gate(&self, query: Query) -> Result<(), ClusterError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&query) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(&query) {
            return Err(ClusterError::Api {
                query,
                source: kube::Error::Service("injected failure".into()),
            });
        }
        Ok(())
    }

    fn namespace(&self, name: &str) -> Option<&(String, usize, usize)> {
        self.namespaces.iter().find(|(n, _, _)| n == name)
    }
}

#[async_trait]
impl ClusterSource for StaticSource {
    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        self.gate(Query::Nodes).await?;
        Ok(self.nodes.clone())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        self.gate(Query::Namespaces).await?;
        Ok(self.namespaces.iter().map(|(n, _, _)| n.clone()).collect())
    }

    async fn count_pods(&self, namespace: &str) -> Result<usize, ClusterError> {
        self.gate(Query::Pods).await?;
        Ok(self.namespace(namespace).map(|(_, pods, _)| *pods).unwrap_or(0))
    }

    async fn count_services(&self, namespace: &str) -> Result<usize, ClusterError> {
        self.gate(Query::Services).await?;
        Ok(self
            .namespace(namespace)
            .map(|(_, _, services)| *services)
            .unwrap_or(0))
    }

    async fn list_services(&self) -> Result<Vec<ServiceRef>, ClusterError> {
        self.gate(Query::AllServices).await?;
        Ok(self.services.clone())
    }
}
