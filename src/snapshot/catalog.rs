//! Narrow views served by `/api/services` and `/api/databases`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cluster::ServiceRef;

/// Number of illustrative entries that always lead the service list.
pub const SAMPLE_SERVICE_COUNT: usize = 5;

/// Hard cap on live services appended to the list, whatever `max_live` says.
pub const MAX_LIVE_SERVICES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    pub name: String,
    pub error_rate: f64,
    pub p95_latency: u32,
    pub requests_per_sec: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetrics {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub connections: u32,
    pub max_connections: u32,
    pub cache_hit_rate: f64,
    pub replication_lag: u32,
    pub last_backup: String,
}

/// Sample services followed by at most `max_live` live cluster services,
/// never more than [`MAX_LIVE_SERVICES`].
pub fn compose_services<R: Rng>(live: &[ServiceRef], max_live: usize, rng: &mut R) -> Vec<ServiceMetrics> {
    let mut services = vec![
        service("auth-service", 0.8, 234, 1200, "healthy"),
        service("data-processor", 0.02, 845, 450, "healthy"),
        service("webhook-handler", 0.5, 123, 890, "degraded"),
        service("api-gateway", 0.01, 89, 3400, "healthy"),
        service("ml-inference", 0.03, 567, 230, "healthy"),
    ];

    services.extend(live.iter().take(max_live.min(MAX_LIVE_SERVICES)).map(|svc| ServiceMetrics {
        name: svc.qualified_name(),
        error_rate: rng.random::<f64>() * 0.5,
        p95_latency: rng.random_range(50..550),
        requests_per_sec: rng.random_range(100..1100),
        status: "healthy".to_string(),
    }));

    services
}

/// Fully simulated database fleet.
pub fn compose_databases<R: Rng>(rng: &mut R) -> Vec<DatabaseMetrics> {
    vec![
        DatabaseMetrics {
            name: "postgres-main".to_string(),
            kind: "PostgreSQL".to_string(),
            status: "Ready".to_string(),
            cpu_usage: 12.0 + rng.random::<f64>() * 5.0,
            memory_usage: 45.0 + rng.random::<f64>() * 10.0,
            connections: rng.random_range(24..44),
            max_connections: 100,
            cache_hit_rate: 98.2,
            replication_lag: 0,
            last_backup: "2h ago".to_string(),
        },
        DatabaseMetrics {
            name: "redis-cache".to_string(),
            kind: "Redis".to_string(),
            status: "Ready".to_string(),
            cpu_usage: 8.0 + rng.random::<f64>() * 3.0,
            memory_usage: 22.0 + rng.random::<f64>() * 10.0,
            connections: rng.random_range(145..195),
            max_connections: 500,
            cache_hit_rate: 99.1,
            replication_lag: 0,
            last_backup: "N/A".to_string(),
        },
        DatabaseMetrics {
            name: "mongo-analytics".to_string(),
            kind: "MongoDB".to_string(),
            status: "Degraded".to_string(),
            cpu_usage: 78.0 + rng.random::<f64>() * 10.0,
            memory_usage: 82.0 + rng.random::<f64>() * 10.0,
            connections: 89,
            max_connections: 100,
            cache_hit_rate: 87.3,
            replication_lag: 4200,
            last_backup: "4h ago".to_string(),
        },
    ]
}

fn service(name: &str, error_rate: f64, p95_latency: u32, requests_per_sec: u32, status: &str) -> ServiceMetrics {
    ServiceMetrics {
        name: name.to_string(),
        error_rate,
        p95_latency,
        requests_per_sec,
        status: status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn live(n: usize) -> Vec<ServiceRef> {
        (0..n).map(|i| ServiceRef::new("default", format!("svc-{i}"))).collect()
    }

    #[test]
    fn test_samples_only_when_no_live_services() {
        let services = compose_services(&[], 5, &mut StdRng::seed_from_u64(0));
        assert_eq!(services.len(), SAMPLE_SERVICE_COUNT);
        assert_eq!(services[0].name, "auth-service");
        assert_eq!(services[2].status, "degraded");
    }

    #[test]
    fn test_live_services_appended_after_samples() {
        let services = compose_services(&live(2), 5, &mut StdRng::seed_from_u64(0));
        assert_eq!(services.len(), SAMPLE_SERVICE_COUNT + 2);
        assert_eq!(services[5].name, "default/svc-0");
        assert_eq!(services[6].name, "default/svc-1");
    }

    #[test]
    fn test_live_services_capped() {
        for n in [5, 6, 40] {
            let services = compose_services(&live(n), 5, &mut StdRng::seed_from_u64(n as u64));
            assert_eq!(services.len(), SAMPLE_SERVICE_COUNT + 5);
        }
    }

    #[test]
    fn test_oversized_limit_still_capped() {
        let services = compose_services(&live(30), 50, &mut StdRng::seed_from_u64(1));
        assert_eq!(services.len(), SAMPLE_SERVICE_COUNT + MAX_LIVE_SERVICES);
    }

    #[test]
    fn test_live_service_ranges() {
        let mut rng = StdRng::seed_from_u64(11);
        let services = compose_services(&live(5), 5, &mut rng);
        for svc in &services[SAMPLE_SERVICE_COUNT..] {
            assert!((0.0..0.5).contains(&svc.error_rate));
            assert!((50..550).contains(&svc.p95_latency));
            assert!((100..1100).contains(&svc.requests_per_sec));
            assert_eq!(svc.status, "healthy");
        }
    }

    #[test]
    fn test_databases() {
        let mut rng = StdRng::seed_from_u64(5);
        let databases = compose_databases(&mut rng);
        let names: Vec<&str> = databases.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["postgres-main", "redis-cache", "mongo-analytics"]);
        assert!((12.0..17.0).contains(&databases[0].cpu_usage));
        assert!((24..44).contains(&databases[0].connections));
        assert!((145..195).contains(&databases[1].connections));
        assert_eq!(databases[2].replication_lag, 4200);
    }

    #[test]
    fn test_database_json_field_names() {
        let databases = compose_databases(&mut StdRng::seed_from_u64(0));
        let json = serde_json::to_value(&databases[0]).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "cacheHitRate",
                "connections",
                "cpuUsage",
                "lastBackup",
                "maxConnections",
                "memoryUsage",
                "name",
                "replicationLag",
                "status",
                "type",
            ]
        );
    }

    #[test]
    fn test_service_json_field_names() {
        let services = compose_services(&[], 5, &mut StdRng::seed_from_u64(0));
        let json = serde_json::to_value(&services[0]).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["errorRate", "name", "p95Latency", "requestsPerSec", "status"]);
    }
}
