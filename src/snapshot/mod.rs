//! Dashboard snapshot model and composition.
//!
//! A [`Snapshot`] is built in one pass by [`compose_snapshot`] from the
//! reader's [`ClusterState`](crate::cluster::ClusterState), an injected
//! [`Clock`] and an injected random source. Everything not backed by a live
//! query is a filler value drawn from fixed ranges.
//!
//! All types serialize with camelCase keys; the dashboard frontend depends
//! on these names.

pub mod catalog;
pub mod clock;
pub mod composer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use catalog::{compose_databases, compose_services, DatabaseMetrics, ServiceMetrics};
pub use clock::{Clock, FixedClock, SystemClock};
pub use composer::compose_snapshot;

/// One complete composed status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub installations: InstallationsSummary,
    pub services: ServicesSummary,
    pub databases: DatabasesSummary,
    pub cluster: ClusterSummary,
    pub security: SecuritySummary,
    pub projects: Vec<ProjectStatus>,
    pub namespaces: Vec<NamespaceRecord>,
    pub alerts: Vec<Alert>,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationsSummary {
    pub total: u32,
    pub healthy: u32,
    pub degraded: u32,
    pub offline: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesSummary {
    pub total: u32,
    /// Percent.
    pub uptime: f64,
    /// Percent.
    pub error_rate: f64,
    /// Milliseconds.
    pub p95_latency: u32,
    pub deployments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabasesSummary {
    pub total: u32,
    pub all_synced: bool,
    pub backup_status: String,
    /// Milliseconds.
    pub replication_lag: u32,
    pub next_backup_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub nodes: usize,
    pub nodes_ready: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySummary {
    pub status: String,
    pub certificates_ok: bool,
    pub sso_active: bool,
    pub cert_expire_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    pub name: String,
    pub version: String,
    pub status: String,
    pub health: String,
    pub deployment: String,
}

/// Per-namespace resource record. Names are unique within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceRecord {
    pub name: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub pod_count: usize,
    pub service_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub message: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
