//! Project identifier taken from the `:id` path segment.
//!
//! Validation is left to the services so that a malformed id is answered
//! with the JSON 400 body and recorded in the audit trail like any other
//! outcome. This extractor therefore never rejects: a segment axum cannot
//! percent-decode is handed on undecoded.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

/// Raw `:id` path segment, not yet parsed into a `ProjectId`.
///
/// # Example
///
/// ```rust,ignore
/// async fn export(RawProjectId(raw_id): RawProjectId) -> ApiResult<Json<ExportDocument>> {
///     lifecycle.export_data(&raw_id, actor).await.map(Json)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProjectId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RawProjectId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(raw_id)) => Ok(RawProjectId(raw_id)),
            Err(rejection) => {
                let segment = last_segment(parts.uri.path());
                tracing::debug!(
                    segment = %segment,
                    error = %rejection,
                    "Path id could not be decoded"
                );
                Ok(RawProjectId(segment))
            }
        }
    }
}

/// Last non-empty segment of a request path, as received.
fn last_segment(path: &str) -> String {
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn extract(uri: &str) -> Result<String, String> {
        let app = Router::new().route(
            "/api/data/export/:id",
            get(|RawProjectId(raw): RawProjectId| async move { raw }),
        );
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        let response = app.oneshot(request).await.map_err(|e| e.to_string())?;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_decoded_segment_is_passed_through() -> Result<(), String> {
        let raw = extract("/api/data/export/550e8400-e29b-41d4-a716-446655440000").await?;
        assert_eq!(raw, "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(extract("/api/data/export/a%20b").await?, "a b");
        Ok(())
    }

    #[tokio::test]
    async fn test_undecodable_segment_is_kept_raw() -> Result<(), String> {
        assert_eq!(extract("/api/data/export/%FF").await?, "%FF");
        assert_eq!(extract("/api/data/export/%FF%FE").await?, "%FF%FE");
        Ok(())
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/api/download/abc"), "abc");
        assert_eq!(last_segment("/api/download/abc/"), "abc");
        assert_eq!(last_segment("/"), "");
    }
}
