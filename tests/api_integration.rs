//! Router-level tests against an in-memory cluster.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use batteries_api::cluster::testing::{node, StaticSource};
use batteries_api::cluster::{ClusterReader, Query};
use batteries_api::server::{router, AppState};
use batteries_api::snapshot::FixedClock;

fn app(source: StaticSource) -> Router {
    let reader = ClusterReader::new(Arc::new(source), Duration::from_secs(1));
    router(AppState::new(Arc::new(reader)).clock(Arc::new(FixedClock::epoch())))
}

fn scenario() -> StaticSource {
    StaticSource::new()
        .with_nodes(vec![
            node("worker-1", &[("Ready", "True")]),
            node("worker-2", &[("Ready", "False")]),
        ])
        .with_namespace("default", 3, 1)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = get(app(StaticSource::new()), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
}

#[tokio::test]
async fn dashboard_reflects_cluster() {
    let (status, body) = get(app(scenario()), "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cluster"]["nodes"], 2);
    assert_eq!(body["cluster"]["nodesReady"], 1);
    assert_eq!(body["namespaces"].as_array().unwrap().len(), 1);
    assert_eq!(body["namespaces"][0]["name"], "default");
    assert_eq!(body["namespaces"][0]["podCount"], 3);
    assert_eq!(body["namespaces"][0]["serviceCount"], 1);
    assert_eq!(body["alerts"][0]["timestamp"], "2024-01-01T11:45:00Z");
    assert_eq!(body["installations"]["total"], 3);
}

#[tokio::test]
async fn dashboard_survives_failing_cluster() {
    let source = StaticSource::new()
        .failing(Query::Nodes)
        .failing(Query::Namespaces);
    let (status, body) = get(app(source), "/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cluster"]["nodes"], 0);
    assert_eq!(body["cluster"]["nodesReady"], 0);
    assert_eq!(body["namespaces"], json!([]));
    assert_eq!(body["alerts"].as_array().unwrap().len(), 2);
    assert_eq!(body["recentActivity"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn services_caps_live_entries() {
    let mut source = StaticSource::new();
    for i in 0..12 {
        source = source.with_service("apps", &format!("svc-{i}"));
    }
    let (status, body) = get(app(source), "/api/services").await;
    assert_eq!(status, StatusCode::OK);
    let services = body.as_array().unwrap();
    assert_eq!(services.len(), 10);
    assert_eq!(services[5]["name"], "apps/svc-0");
    assert_eq!(services[5]["status"], "healthy");
}

#[tokio::test]
async fn services_without_cluster_returns_samples() {
    let source = StaticSource::new().failing(Query::AllServices);
    let (_, body) = get(app(source), "/api/services").await;
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn databases_lists_three_engines() {
    let (status, body) = get(app(StaticSource::new()), "/api/databases").await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|db| db["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.len(), 3);
    assert!(kinds.contains(&"PostgreSQL"));
}

#[tokio::test]
async fn cors_preflight_mirrors_origin_with_credentials() {
    let response = app(StaticSource::new())
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/dashboard")
                .header(header::ORIGIN, "http://dashboard.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://dashboard.example"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn metrics_count_failed_queries() {
    let app = app(StaticSource::new().failing(Query::Nodes));
    let _ = get(app.clone(), "/api/dashboard").await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("batteries_cluster_queries_total{query=\"nodes\"} 1"));
    assert!(text.contains("batteries_cluster_query_failures_total{query=\"nodes\"} 1"));
    assert!(text.contains("batteries_cluster_query_failures_total{query=\"namespaces\"} 0"));
}
