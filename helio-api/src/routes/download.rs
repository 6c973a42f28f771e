//! Report Download Routes
//!
//! - `GET /api/download/{id}` streams the PDF for a paid project
//! - `HEAD /api/download/{id}` answers availability with an empty body

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ClientActor, RawProjectId};
use crate::services::{ReportRequest, ReportService};
use crate::state::AppState;

/// Query parameters of a download.
///
/// Both are read leniently: unknown formats fall back to detailed and only
/// explicit false-like values switch the financial section off.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
    pub include_financial: Option<String>,
}

impl DownloadQuery {
    pub fn report_request(&self) -> ReportRequest {
        ReportRequest::from_query(self.format.as_deref(), self.include_financial.as_deref())
    }
}

/// GET /api/download/{id}
pub async fn download_report(
    State(reports): State<ReportService>,
    RawProjectId(raw_id): RawProjectId,
    Query(query): Query<DownloadQuery>,
    ClientActor(actor): ClientActor,
) -> ApiResult<Response> {
    let download = reports
        .get_report(&raw_id, query.report_request(), actor)
        .await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download.filename
    ))
    .map_err(|e| ApiError::internal_error(format!("Invalid Content-Disposition: {}", e)))?;
    let cache_state = if download.cache_hit { "hit" } else { "miss" };

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (
                HeaderName::from_static("x-report-cache"),
                HeaderValue::from_static(cache_state),
            ),
        ],
        download.bytes,
    )
        .into_response())
}

/// HEAD /api/download/{id}
///
/// Same checks as a download, minus rendering. Never carries a body.
pub async fn report_availability(
    State(reports): State<ReportService>,
    RawProjectId(raw_id): RawProjectId,
    ClientActor(actor): ClientActor,
) -> StatusCode {
    match reports.head_availability(&raw_id, actor).await {
        Ok(()) => StatusCode::OK,
        Err(e) => ApiError::from(e).status_code(),
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new().route(
        "/api/download/:id",
        get(download_report).head(report_availability),
    )
}
