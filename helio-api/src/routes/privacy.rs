//! Data Privacy Routes
//!
//! - `DELETE /api/data/privacy/{id}` erases a project and its calculations
//! - `GET /api/data/export/{id}` exports everything stored about a project

use axum::{
    extract::State,
    routing::{delete, get},
    Json, Router,
};
use helio_core::{DeletionConfirmation, ExportDocument};

use crate::error::ApiResult;
use crate::extractors::{ClientActor, RawProjectId};
use crate::services::LifecycleService;
use crate::state::AppState;

/// DELETE /api/data/privacy/{id}
pub async fn delete_data(
    State(lifecycle): State<LifecycleService>,
    RawProjectId(raw_id): RawProjectId,
    ClientActor(actor): ClientActor,
) -> ApiResult<Json<DeletionConfirmation>> {
    let confirmation = lifecycle.delete_data(&raw_id, actor).await?;
    Ok(Json(confirmation))
}

/// GET /api/data/export/{id}
pub async fn export_data(
    State(lifecycle): State<LifecycleService>,
    RawProjectId(raw_id): RawProjectId,
    ClientActor(actor): ClientActor,
) -> ApiResult<Json<ExportDocument>> {
    let document = lifecycle.export_data(&raw_id, actor).await?;
    Ok(Json(document))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/data/privacy/:id", delete(delete_data))
        .route("/api/data/export/:id", get(export_data))
}
