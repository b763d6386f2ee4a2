use chrono::TimeDelta;
use rand::Rng;

use super::{
    ActivityEntry, Alert, ClusterSummary, Clock, DatabasesSummary, InstallationsSummary,
    NamespaceRecord, ProjectStatus, SecuritySummary, ServicesSummary, Snapshot,
};
use crate::cluster::ClusterState;

const CLUSTER_CPU_BASE: f64 = 42.0;
const CLUSTER_MEMORY_BASE: f64 = 58.0;
const CLUSTER_USAGE_JITTER: f64 = 10.0;

/// Build a complete snapshot from one reader pass.
///
/// Pure: the only inputs are `state`, `clock` and `rng`. Node and namespace
/// counts come from `state`; every other field is a filler value.
pub fn compose_snapshot<R>(state: &ClusterState, clock: &dyn Clock, rng: &mut R) -> Snapshot
where
    R: Rng,
{
    let now = clock.now();

    let namespaces = state
        .namespaces
        .iter()
        .map(|ns| NamespaceRecord {
            name: ns.name.clone(),
            cpu_usage: rng.random::<f64>() * 100.0,
            memory_usage: rng.random::<f64>() * 100.0,
            pod_count: ns.pod_count,
            service_count: ns.service_count,
        })
        .collect();

    let cluster = ClusterSummary {
        cpu_usage: CLUSTER_CPU_BASE + rng.random::<f64>() * CLUSTER_USAGE_JITTER,
        memory_usage: CLUSTER_MEMORY_BASE + rng.random::<f64>() * CLUSTER_USAGE_JITTER,
        nodes: state.nodes,
        nodes_ready: state.nodes_ready.min(state.nodes),
    };

    Snapshot {
        installations: InstallationsSummary {
            total: 3,
            healthy: 2,
            degraded: 1,
            offline: 0,
        },
        services: ServicesSummary {
            total: 47,
            uptime: 99.2,
            error_rate: 0.02,
            p95_latency: 145,
            deployments: 3,
        },
        databases: DatabasesSummary {
            total: 8,
            all_synced: true,
            backup_status: "Completed".to_string(),
            replication_lag: 0,
            next_backup_hours: 2,
        },
        cluster,
        security: SecuritySummary {
            status: "OK".to_string(),
            certificates_ok: true,
            sso_active: true,
            cert_expire_days: 82,
        },
        projects: vec![
            project("batteries-core", "v2.1.0", "Running", "Healthy", "Stable"),
            project("ml-workspace", "v1.0.0", "Deploying", "Degraded", "In Progress"),
            project("api-gateway", "v1.8.3", "Running", "Healthy", "Stable"),
        ],
        namespaces,
        alerts: vec![
            Alert {
                kind: "warning".to_string(),
                severity: "medium".to_string(),
                message: "High Memory Usage".to_string(),
                source: "mongo-analytics".to_string(),
                timestamp: now - TimeDelta::minutes(15),
            },
            Alert {
                kind: "info".to_string(),
                severity: "low".to_string(),
                message: "Scheduled Maintenance".to_string(),
                source: "system".to_string(),
                timestamp: now - TimeDelta::hours(2),
            },
        ],
        recent_activity: vec![
            activity("deployment", "Deployment completed", now - TimeDelta::minutes(5)),
            activity("scaling", "Auto-scaling triggered", now - TimeDelta::minutes(12)),
            activity("backup", "Backup completed", now - TimeDelta::hours(2)),
        ],
    }
}

fn project(name: &str, version: &str, status: &str, health: &str, deployment: &str) -> ProjectStatus {
    ProjectStatus {
        name: name.to_string(),
        version: version.to_string(),
        status: status.to_string(),
        health: health.to_string(),
        deployment: deployment.to_string(),
    }
}

fn activity(kind: &str, message: &str, timestamp: chrono::DateTime<chrono::Utc>) -> ActivityEntry {
    ActivityEntry {
        kind: kind.to_string(),
        message: message.to_string(),
        timestamp,
    }
}
