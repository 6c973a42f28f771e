//! REST API Routes
//!
//! - Report downloads and availability under `/api/download`
//! - Cache administration under `/api/cache`
//! - Data-subject export and erasure under `/api/data`
//! - `/health` and `/metrics` (never rate limited)

pub mod cache;
pub mod download;
pub mod health;
pub mod privacy;

use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::ApiConfig;
use crate::middleware::rate_limit_middleware;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow every origin; otherwise only configured origins
/// (including `*.domain` wildcards) are allowed.
pub fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static("x-report-cache"),
            HeaderName::from_static("x-ratelimit-limit"),
            header::RETRY_AFTER,
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let config = config.clone();
        cors.allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request| {
                origin
                    .to_str()
                    .map(|o| config.is_origin_allowed(o))
                    .unwrap_or(false)
            },
        ))
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete router.
///
/// Layers, inner to outer: rate limiting, observability, CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    Router::new()
        .merge(download::create_router())
        .merge(cache::create_router())
        .merge(privacy::create_router())
        .merge(health::create_router())
        .route("/metrics", get(metrics_handler))
        .layer(from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_middleware,
        ))
        .layer(from_fn(observability_middleware))
        .layer(cors)
        .with_state(state)
}
