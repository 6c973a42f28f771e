//! HELIO API Server Entry Point
//!
//! Reads configuration from the environment, connects the PostgreSQL pool,
//! opens the report cache and audit trail, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use helio_api::constants::DEFAULT_API_PORT;
use helio_api::telemetry::{init_tracing, TelemetryConfig};
use helio_api::{
    create_router, open_audit_sink, open_report_cache, ApiConfig, ApiError, ApiResult, AppState,
    DbConfig, PgProjectStore, RenderPipeline,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env();
    let db_config = DbConfig::from_env();
    let store = Arc::new(PgProjectStore::from_config(&db_config)?);

    let cache = open_report_cache(&api_config.cache_backend)?;
    let audit = open_audit_sink(&api_config).await?;

    let state = AppState::new(api_config, store, cache, RenderPipeline::builtin(), audit);
    let app = create_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting HELIO API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("HELIO_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("HELIO_API_PORT").ok())
        .unwrap_or_else(|| DEFAULT_API_PORT.to_string());
    let port = port_str.parse::<u16>().map_err(|_| {
        ApiError::internal_error(format!("Invalid port value: {}", port_str))
    })?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>().map_err(|e| {
        ApiError::internal_error(format!("Invalid bind address {}: {}", addr, e))
    })
}
