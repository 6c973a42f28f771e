//! Cache Administration Routes
//!
//! - `POST /api/cache/clear/{id}` drops every cached variant of one report
//! - `POST /api/cache/clear-all` drops every cached report

use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::extractors::{ClientActor, RawProjectId};
use crate::services::CacheService;
use crate::state::AppState;

/// Confirmation body of a cache purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/cache/clear/{id}
pub async fn clear_cache(
    State(cache): State<CacheService>,
    RawProjectId(raw_id): RawProjectId,
    ClientActor(actor): ClientActor,
) -> ApiResult<Json<MessageResponse>> {
    let message = cache.clear_cache(&raw_id, actor).await?;
    Ok(Json(MessageResponse { message }))
}

/// POST /api/cache/clear-all
pub async fn clear_all_cache(
    State(cache): State<CacheService>,
    ClientActor(actor): ClientActor,
) -> ApiResult<Json<MessageResponse>> {
    let message = cache.clear_all(actor).await?;
    Ok(Json(MessageResponse { message }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/cache/clear/:id", post(clear_cache))
        .route("/api/cache/clear-all", post(clear_all_cache))
}
