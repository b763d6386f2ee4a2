use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub push: PushConfig,
    pub cluster: ClusterConfig,
    pub services: ServicesConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// WebSocket push configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub interval_secs: u64,
}

/// Cluster API access configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Explicit kubeconfig path. When unset, `KUBECONFIG` and then
    /// `~/.kube/config` are tried after in-cluster credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
    /// Deadline applied to every individual list query.
    pub request_timeout_secs: u64,
    /// Pod and service list calls in flight at once while reading namespaces.
    pub max_concurrent_queries: usize,
}

/// `/api/services` configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Maximum number of live cluster services appended after the samples.
    /// At most 5.
    pub max_live: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            request_timeout_secs: 10,
            max_concurrent_queries: 4,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self { max_live: 5 }
    }
}

impl PushConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl ClusterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ServerConfig {
    /// Address string suitable for `TcpListener::bind`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
