//! Error Types for the HELIO API
//!
//! This module defines error handling for the HTTP layer:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Every error is serialized as `{"error": "...", "code": "..."}`. Messages are
//! generic; internal causes go to the log, never into the body.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use helio_core::{MissingEntity, ReportError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Path identifier is not a UUID
    InvalidProjectId,

    // ========================================================================
    // Entitlement Errors (403)
    // ========================================================================
    /// Project has not been paid for
    PaymentRequired,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    ProjectNotFound,

    /// Project exists but has no calculation yet
    CalculationNotFound,

    // ========================================================================
    // Throttling (429)
    // ========================================================================
    TooManyRequests,

    // ========================================================================
    // Server Errors (5xx)
    // ========================================================================
    InternalError,

    /// Store unreachable, pool exhausted or a failed query
    DatabaseError,
    RenderFailed,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidProjectId => StatusCode::BAD_REQUEST,

            ErrorCode::PaymentRequired => StatusCode::FORBIDDEN,

            ErrorCode::ProjectNotFound | ErrorCode::CalculationNotFound => StatusCode::NOT_FOUND,

            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            ErrorCode::InternalError | ErrorCode::DatabaseError | ErrorCode::RenderFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the client-facing message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidProjectId => "Invalid project ID format",
            ErrorCode::PaymentRequired => "Project must be paid before downloading the report",
            ErrorCode::ProjectNotFound => "Project not found",
            ErrorCode::CalculationNotFound => "Calculation results not found for this project",
            ErrorCode::TooManyRequests => "Rate limit exceeded",
            ErrorCode::InternalError | ErrorCode::DatabaseError | ErrorCode::RenderFailed => {
                "Internal server error"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: String,

    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Seconds until a throttled client may retry; sent as `Retry-After`.
    #[serde(skip)]
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            retry_after_secs: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn invalid_project_id() -> Self {
        Self::from_code(ErrorCode::InvalidProjectId)
    }

    pub fn project_not_found() -> Self {
        Self::from_code(ErrorCode::ProjectNotFound)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Create a TooManyRequests error.
    pub fn too_many_requests(retry_after_secs: Option<u64>) -> Self {
        Self {
            retry_after_secs,
            ..Self::from_code(ErrorCode::TooManyRequests)
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after_secs;
        let mut response = (status, Json(self)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl ErrorCode {
    /// The code a domain error is reported to clients with.
    pub fn for_report_error(err: &ReportError) -> Self {
        match err {
            ReportError::InvalidId { .. } => ErrorCode::InvalidProjectId,
            ReportError::Forbidden { .. } => ErrorCode::PaymentRequired,
            ReportError::NotFound {
                entity: MissingEntity::Project,
                ..
            } => ErrorCode::ProjectNotFound,
            ReportError::NotFound {
                entity: MissingEntity::Calculation,
                ..
            } => ErrorCode::CalculationNotFound,
            ReportError::Upstream { .. } => ErrorCode::DatabaseError,
            ReportError::Render { .. } => ErrorCode::RenderFailed,
        }
    }
}

/// Map a domain error onto its client-facing form.
///
/// Upstream and render failures are logged here with their cause; the body
/// only ever carries the generic message.
impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        let code = ErrorCode::for_report_error(&err);
        match err {
            ReportError::Upstream { reason } => {
                tracing::error!(cause = %reason, "Upstream data error");
                ApiError::from_code(code)
            }
            ReportError::Render { reason } => {
                tracing::error!(cause = %reason, "Report rendering failed");
                ApiError::from_code(code)
            }
            _ => ApiError::from_code(code),
        }
    }
}

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ApiError::database_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
///
/// Every pool failure is a store failure to the client (500); the variant
/// only shapes the log line.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Timeout(kind) => {
                tracing::error!(timeout = ?kind, "Connection pool exhausted");
                ApiError::database_error("Connection pool exhausted")
            }
            deadpool_postgres::PoolError::Closed => {
                tracing::error!("Connection pool is closed");
                ApiError::database_error("Connection pool is closed")
            }
            other => {
                tracing::error!("Connection pool error: {:?}", other);
                ApiError::database_error("Failed to acquire database connection")
            }
        }
    }
}

/// The PostgreSQL adapter works in `ApiResult` internally and hands failures
/// back to the services as upstream errors.
impl From<ApiError> for ReportError {
    fn from(err: ApiError) -> Self {
        ReportError::upstream(err.to_string())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
