//! Health Check Endpoint
//!
//! `GET /health` reports healthy only while the project store answers a
//! ping. Never rate limited.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub timestamp: helio_core::Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let service = state.config.service_name.clone();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: HealthStatus::Healthy,
                service,
                timestamp: Utc::now(),
                uptime_seconds: Some(state.start_time.elapsed().as_secs()),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: HealthStatus::Unhealthy,
                    service,
                    timestamp: Utc::now(),
                    uptime_seconds: None,
                    error: Some("Database connection failed".to_string()),
                }),
            )
        }
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
