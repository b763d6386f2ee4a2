//! Read-only access to the Kubernetes control plane.
//!
//! [`ClusterSource`] is the thin client seam over the cluster API. The
//! production implementation, [`KubeClusterSource`], wraps a `kube::Client`.
//! [`ClusterReader`] fans the individual list queries out, applies a
//! per-query deadline and downgrades every failure to an empty result so a
//! single broken query never takes the whole snapshot down.

pub mod kube_source;
pub mod reader;
pub mod testing;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use serde::{Deserialize, Serialize};

pub use kube_source::{default_kubeconfig_path, resolve_kube_config, KubeClusterSource};
pub use reader::{best_effort, node_is_ready, ClusterReader};

/// Error type for cluster API operations.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Failed to read kubeconfig {path}: {source}")]
    Kubeconfig {
        path: String,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("No kubeconfig path available: KUBECONFIG is unset and no home directory was found")]
    NoKubeconfig,

    #[error("Failed to create Kubernetes client: {0}")]
    ClientCreation(#[source] kube::Error),

    #[error("Cluster query '{query}' failed: {source}")]
    Api {
        query: Query,
        #[source]
        source: kube::Error,
    },

    #[error("Cluster query '{query}' timed out after {timeout:?}")]
    Timeout { query: Query, timeout: Duration },
}

/// The individual list queries issued against the cluster API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    Nodes,
    Namespaces,
    Pods,
    Services,
    AllServices,
}

impl Query {
    pub const ALL: [Query; 5] = [
        Query::Nodes,
        Query::Namespaces,
        Query::Pods,
        Query::Services,
        Query::AllServices,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Query::Nodes => "nodes",
            Query::Namespaces => "namespaces",
            Query::Pods => "pods",
            Query::Services => "services",
            Query::AllServices => "all_services",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Query::Nodes => 0,
            Query::Namespaces => 1,
            Query::Pods => 2,
            Query::Services => 3,
            Query::AllServices => 4,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service discovered in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub namespace: String,
    pub name: String,
}

impl ServiceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `namespace/name`, the form shown on the dashboard.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Live counts for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceCounts {
    pub name: String,
    pub pod_count: usize,
    pub service_count: usize,
}

/// Everything the reader learned about the cluster in one pass.
///
/// Failed queries show up as zero counts or missing namespaces, never as
/// errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterState {
    pub nodes: usize,
    pub nodes_ready: usize,
    /// In API return order.
    pub namespaces: Vec<NamespaceCounts>,
}

/// Read-only queries against the cluster API.
///
/// Implementations must be safe for concurrent use; the same source is
/// shared by every connection.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError>;

    /// Namespace names in the order the API returned them.
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError>;

    async fn count_pods(&self, namespace: &str) -> Result<usize, ClusterError>;

    async fn count_services(&self, namespace: &str) -> Result<usize, ClusterError>;

    /// Services across all namespaces.
    async fn list_services(&self) -> Result<Vec<ServiceRef>, ClusterError>;
}
