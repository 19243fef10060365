//! HTTP API tests for battwatchd
//!
//! Drives the full router (routes + CORS + tracing layers) with an
//! in-memory store and a fixed telemetry source.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use battwatch_common::{
    BatteryError, BatteryReading, BatteryService, Snapshot, SnapshotStore, TelemetrySource,
};
use battwatchd::routes::{ErrorResponse, HealthResponse, LogResponse};
use battwatchd::server::{build_router, AppState};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceExt;

const DASHBOARD_ORIGIN: &str = "http://localhost:5173";

struct FixedSource(Result<BatteryReading, BatteryError>);

impl TelemetrySource for FixedSource {
    fn read_current(&self) -> Result<BatteryReading, BatteryError> {
        self.0.clone()
    }
}

fn scenario_reading() -> BatteryReading {
    BatteryReading {
        cycle_count: Some(120),
        current_capacity: Some(41_000),
        max_capacity: Some(50_000),
        designed_capacity: Some(52_000),
        voltage: Some(12.6),
        ..BatteryReading::new(83, false, false)
    }
}

fn app_with(source: FixedSource, store: Option<SnapshotStore>) -> Router {
    let service = BatteryService::new(Arc::new(source), store.map(Arc::new));
    build_router(
        AppState::new(service),
        &[DASHBOARD_ORIGIN.to_string()],
    )
}

fn healthy_app() -> Router {
    app_with(
        FixedSource(Ok(scenario_reading())),
        Some(SnapshotStore::open_in_memory().unwrap()),
    )
}

fn failing_app() -> Router {
    app_with(
        FixedSource(Err(BatteryError::SourceUnavailable(
            "no battery present".into(),
        ))),
        Some(SnapshotStore::open_in_memory().unwrap()),
    )
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json<T: DeserializeOwned>(app: &Router, method: Method, uri: &str) -> (StatusCode, T) {
    let (status, body) = send(app, method, uri).await;
    let parsed = serde_json::from_slice(&body)
        .unwrap_or_else(|e| panic!("bad JSON from {}: {} ({:?})", uri, e, String::from_utf8_lossy(&body)));
    (status, parsed)
}

// ============================================================================
// Current status
// ============================================================================

#[tokio::test]
async fn test_current_is_passthrough() {
    let app = healthy_app();
    let (status, reading): (_, BatteryReading) =
        send_json(&app, Method::GET, "/api/battery/current").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reading, scenario_reading());
}

#[tokio::test]
async fn test_current_source_failure_is_500() {
    let app = failing_app();
    let (status, body): (_, ErrorResponse) =
        send_json(&app, Method::GET, "/api/battery/current").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.error.is_empty());
    // Internal cause is not leaked
    assert!(!body.error.contains("no battery present"));
}

// ============================================================================
// Logging and history
// ============================================================================

#[tokio::test]
async fn test_empty_history_is_ok() {
    let app = healthy_app();
    let (status, history): (_, Vec<Snapshot>) =
        send_json(&app, Method::GET, "/api/battery/history").await;

    assert_eq!(status, StatusCode::OK);
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_log_then_history_scenario() {
    let app = healthy_app();

    let (status, logged): (_, LogResponse) =
        send_json(&app, Method::POST, "/api/battery/log").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged.message, "Battery status logged");

    let (_, history): (_, Vec<Snapshot>) =
        send_json(&app, Method::GET, "/api/battery/history").await;
    let first = &history[0];
    assert_eq!(first, &logged.log);
    assert_eq!(first.percent, 83);
    assert_eq!(first.capacity.current, Some(41_000));
    assert_eq!(first.capacity.max, Some(50_000));
    assert_eq!(first.capacity.designed, Some(52_000));
}

#[tokio::test]
async fn test_n_logs_make_n_records_newest_first() {
    let app = healthy_app();
    let mut ids = Vec::new();
    for _ in 0..5 {
        let (_, logged): (_, LogResponse) =
            send_json(&app, Method::POST, "/api/battery/log").await;
        ids.push(logged.log.id);
    }

    // Identical source output still yields distinct records
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);

    let (_, history): (_, Vec<Snapshot>) =
        send_json(&app, Method::GET, "/api/battery/history").await;
    assert_eq!(history.len(), 5);
    assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    ids.reverse();
    assert_eq!(history.iter().map(|s| s.id).collect::<Vec<_>>(), ids);
}

#[tokio::test]
async fn test_history_never_exceeds_cap() {
    let store = SnapshotStore::open_in_memory().unwrap();
    let reading = scenario_reading();
    for _ in 0..120 {
        store.insert((&reading).into()).unwrap();
    }
    let app = app_with(FixedSource(Ok(reading)), Some(store));

    let (_, history): (_, Vec<Snapshot>) =
        send_json(&app, Method::GET, "/api/battery/history").await;
    assert_eq!(history.len(), 100);

    let (_, history): (_, Vec<Snapshot>) =
        send_json(&app, Method::GET, "/api/battery/history?limit=500").await;
    assert_eq!(history.len(), 100);

    let (_, history): (_, Vec<Snapshot>) =
        send_json(&app, Method::GET, "/api/battery/history?limit=10").await;
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].id, 120);
}

#[tokio::test]
async fn test_malformed_history_limit_is_json_error() {
    let app = healthy_app();
    for uri in ["/api/battery/history?limit=abc", "/api/battery/history?limit=-1"] {
        let (status, body): (_, ErrorResponse) = send_json(&app, Method::GET, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Invalid limit parameter");
    }
}

#[tokio::test]
async fn test_log_source_failure_is_500_and_writes_nothing() {
    let app = failing_app();
    let (status, body): (_, ErrorResponse) =
        send_json(&app, Method::POST, "/api/battery/log").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.error.is_empty());

    let (_, history): (_, Vec<Snapshot>) =
        send_json(&app, Method::GET, "/api/battery/history").await;
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_missing_store_fails_store_paths_only() {
    let app = app_with(FixedSource(Ok(scenario_reading())), None);

    let (status, _) = send(&app, Method::GET, "/api/battery/current").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body): (_, ErrorResponse) =
        send_json(&app, Method::GET, "/api/battery/history").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.error, "Failed to fetch history");

    let (status, body): (_, ErrorResponse) =
        send_json(&app, Method::POST, "/api/battery/log").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.error, "Failed to log data");

    let (_, health): (_, HealthResponse) = send_json(&app, Method::GET, "/health").await;
    assert_eq!(health.store, "unavailable");
}

#[tokio::test]
async fn test_health_reports_connected_store() {
    let app = healthy_app();
    let (status, health): (_, HealthResponse) = send_json(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health.status, "ok");
    assert_eq!(health.store, "connected");
}

// ============================================================================
// Cross-origin policy
// ============================================================================

#[tokio::test]
async fn test_allowed_origin_gets_credentials() {
    let app = healthy_app();
    let request = Request::builder()
        .uri("/api/battery/current")
        .header(header::ORIGIN, DASHBOARD_ORIGIN)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        DASHBOARD_ORIGIN
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_unknown_origin_is_not_allowed() {
    let app = healthy_app();
    let request = Request::builder()
        .uri("/api/battery/current")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_wildcard_origin_is_skipped() {
    let service = BatteryService::new(
        Arc::new(FixedSource(Ok(scenario_reading()))),
        Some(Arc::new(SnapshotStore::open_in_memory().unwrap())),
    );
    let app = build_router(
        AppState::new(service),
        &["*".to_string(), DASHBOARD_ORIGIN.to_string()],
    );

    let request = Request::builder()
        .uri("/api/battery/current")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let request = Request::builder()
        .uri("/api/battery/current")
        .header(header::ORIGIN, DASHBOARD_ORIGIN)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        DASHBOARD_ORIGIN
    );
}

#[tokio::test]
async fn test_private_network_preflight() {
    let app = healthy_app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/battery/log")
        .header(header::ORIGIN, DASHBOARD_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header("access-control-request-private-network", "true")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-private-network").unwrap(),
        "true"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        DASHBOARD_ORIGIN
    );
}
