//! Router-level tests for health and metrics.

use axum::http::{Method, StatusCode};

#[path = "support/app.rs"]
mod app_support;
use app_support::TestApp;

#[tokio::test]
async fn healthy_while_store_answers() {
    let app = TestApp::new();

    let response = app.request(Method::GET, "/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "pdf-generation-service");
    assert!(json["timestamp"].is_string());
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn unhealthy_when_store_is_down() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    let response = app.request(Method::GET, "/health").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    let json = response.json();
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["error"], "Database connection failed");
    assert!(!String::from_utf8_lossy(&response.body).contains("connection refused"));
}

#[tokio::test]
async fn metrics_expose_request_counters() {
    let app = TestApp::new();
    let id = app.seed_paid("Measured").await;
    let download = app
        .request(Method::GET, &format!("/api/download/{}", id))
        .await;
    assert_eq!(download.status, StatusCode::OK);

    let response = app.request(Method::GET, "/metrics").await;
    assert_eq!(response.status, StatusCode::OK);

    let text = String::from_utf8_lossy(&response.body);
    assert!(text.contains("helio_http_requests_total"));
    assert!(text.contains("helio_report_renders_total"));
    assert!(text.contains("helio_report_cache_lookups_total"));
}
