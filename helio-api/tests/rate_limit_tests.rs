//! Router-level tests for per-route, per-client rate limiting.

use axum::http::{Method, StatusCode};
use helio_api::ApiConfig;
use helio_core::AuditAction;

#[path = "support/app.rs"]
mod app_support;
use app_support::TestApp;

fn limited(download: u32, export: u32) -> TestApp {
    TestApp::with_config(ApiConfig {
        rate_limit_download: download,
        rate_limit_export: export,
        ..ApiConfig::default()
    })
}

#[tokio::test]
async fn request_over_budget_is_refused_with_retry_after() {
    let app = limited(3, 10);
    let id = app.seed_paid("Busy").await;
    let uri = format!("/api/download/{}", id);

    for _ in 0..3 {
        let response = app
            .request_from(Method::GET, &uri, Some("203.0.113.7"))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("x-ratelimit-limit"), Some("3"));
    }

    let refused = app
        .request_from(Method::GET, &uri, Some("203.0.113.7"))
        .await;
    assert_eq!(refused.status, StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = refused
        .header("retry-after")
        .and_then(|v| v.parse().ok())
        .expect("numeric Retry-After");
    assert!(retry_after >= 1);
    assert_eq!(refused.json()["error"], "Rate limit exceeded");

    let limited_events: Vec<_> = app
        .audit
        .events()
        .into_iter()
        .filter(|e| e.action == AuditAction::RateLimited)
        .collect();
    assert_eq!(limited_events.len(), 1);
    assert_eq!(limited_events[0].actor.client_addr, "203.0.113.7");
}

#[tokio::test]
async fn budgets_are_independent_per_client() {
    let app = limited(1, 10);
    let id = app.seed_paid("Shared").await;
    let uri = format!("/api/download/{}", id);

    let first = app.request_from(Method::GET, &uri, Some("203.0.113.1")).await;
    let second = app.request_from(Method::GET, &uri, Some("203.0.113.2")).await;
    let again = app.request_from(Method::GET, &uri, Some("203.0.113.1")).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(again.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn budgets_are_independent_per_route() {
    let app = limited(1, 1);
    let id = app.seed_paid("Routes").await;
    let client = Some("203.0.113.9");

    let download = app
        .request_from(Method::GET, &format!("/api/download/{}", id), client)
        .await;
    let export = app
        .request_from(Method::GET, &format!("/api/data/export/{}", id), client)
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(export.status, StatusCode::OK);

    let download_again = app
        .request_from(Method::GET, &format!("/api/download/{}", id), client)
        .await;
    assert_eq!(download_again.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn refused_head_has_no_body() {
    let app = limited(1, 10);
    let id = app.seed_paid("Head").await;
    let uri = format!("/api/download/{}", id);
    let client = Some("203.0.113.4");

    let first = app.request_from(Method::HEAD, &uri, client).await;
    assert_eq!(first.status, StatusCode::OK);

    let refused = app.request_from(Method::HEAD, &uri, client).await;
    assert_eq!(refused.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(refused.header("retry-after").is_some());
    assert!(refused.body.is_empty());
}

#[tokio::test]
async fn health_is_never_limited() {
    let app = limited(1, 1);

    for _ in 0..10 {
        let response = app
            .request_from(Method::GET, "/health", Some("203.0.113.5"))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
}
