//! Router-level tests for data export and erasure.

use axum::http::{Method, StatusCode};
use helio_core::{AuditAction, ProjectStatus};
use helio_test_utils::assertions::assert_single_audit;
use helio_test_utils::fixtures::{FIXTURE_ANNUAL_KWH, FIXTURE_COST_USD};

#[path = "support/app.rs"]
mod app_support;
use app_support::TestApp;

#[tokio::test]
async fn export_returns_every_stored_field() {
    let app = TestApp::new();
    let id = app.seed_paid("Exported").await;

    let response = app
        .request(Method::GET, &format!("/api/data/export/{}", id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let json = response.json();
    assert_eq!(json["project_id"], id.to_string());
    assert_eq!(json["project_name"], "Exported");
    assert_eq!(json["status"], "paid");
    assert_eq!(json["cost_usd"], FIXTURE_COST_USD);
    assert_eq!(json["location_lat"], 37.7749);
    assert_eq!(json["location_lon"], -122.4194);
    assert_eq!(json["metadata"]["panel_count"], 24);
    assert_eq!(json["gdpr_compliant"], true);
    assert!(json["export_timestamp"].is_string());

    let calculation = &json["calculation_data"];
    assert_eq!(calculation["annual_kwh"], FIXTURE_ANNUAL_KWH);
    assert_eq!(calculation["financial_data"]["incentive_program"], "SGIP");

    assert_single_audit(&app.audit.events(), AuditAction::ExportData, 200);
}

#[tokio::test]
async fn export_ignores_entitlement() {
    let app = TestApp::new();
    let project = app.seed_project(ProjectStatus::from("archived")).await;

    let response = app
        .request(Method::GET, &format!("/api/data/export/{}", project.id))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["status"], "archived");
    assert!(json["calculation_data"].is_null());
}

#[tokio::test]
async fn export_of_unknown_project_is_not_found() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::GET,
            "/api/data/export/5f0c2a3e-9d4b-4c1e-8a77-000000000001",
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "Project not found");
    assert_single_audit(&app.audit.events(), AuditAction::ExportData, 404);
}

#[tokio::test]
async fn erasure_removes_data_and_cached_reports() {
    let app = TestApp::new();
    let id = app.seed_paid("Forget Me").await;

    let download = app
        .request(Method::GET, &format!("/api/download/{}", id))
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(app.cache.len(), 1);

    let response = app
        .request(Method::DELETE, &format!("/api/data/privacy/{}", id))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["message"], "Project data deleted successfully");
    assert_eq!(json["project_id"], id.to_string());
    assert_eq!(json["calculations_deleted"], 1);
    assert_eq!(json["gdpr_compliant"], true);
    assert!(app.cache.is_empty());

    let after = app
        .request(Method::GET, &format!("/api/download/{}", id))
        .await;
    assert_eq!(after.status, StatusCode::NOT_FOUND);

    let export = app
        .request(Method::GET, &format!("/api/data/export/{}", id))
        .await;
    assert_eq!(export.status, StatusCode::NOT_FOUND);

    let again = app
        .request(Method::DELETE, &format!("/api/data/privacy/{}", id))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn erasure_leaves_other_projects_alone() {
    let app = TestApp::new();
    let erased = app.seed_paid("Erased").await;
    let kept = app.seed_paid("Kept").await;

    for id in [erased, kept] {
        let response = app
            .request(Method::GET, &format!("/api/download/{}", id))
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app
        .request(Method::DELETE, &format!("/api/data/privacy/{}", erased))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.cache.len(), 1);

    let kept_again = app
        .request(Method::GET, &format!("/api/download/{}", kept))
        .await;
    assert_eq!(kept_again.header("x-report-cache"), Some("hit"));
}

#[tokio::test]
async fn failed_erasure_is_a_500_and_keeps_everything() {
    let app = TestApp::new();
    let id = app.seed_paid("Sticky").await;
    let download = app
        .request(Method::GET, &format!("/api/download/{}", id))
        .await;
    assert_eq!(download.status, StatusCode::OK);
    app.store.fail_project_delete(true);

    let response = app
        .request(Method::DELETE, &format!("/api/data/privacy/{}", id))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "Internal server error");
    assert_eq!(app.cache.len(), 1);
    assert_eq!(app.store.calculation_count(id).await, 1);
    assert_single_audit(&app.audit.events(), AuditAction::DeleteData, 500);
}
