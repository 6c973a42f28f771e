//! Error types for HELIO report operations

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// The record that a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingEntity {
    Project,
    Calculation,
}

impl fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEntity::Project => write!(f, "Project"),
            MissingEntity::Calculation => write!(f, "Calculation"),
        }
    }
}

/// Failures of the report-access core.
///
/// Every variant maps onto exactly one HTTP status in the API layer. The
/// `reason` strings carry the internal cause for logs and the audit trail;
/// they are never copied into client-facing response bodies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    /// A path identifier that is not a UUID.
    #[error("Invalid project id: {reason}")]
    InvalidId { reason: String },

    /// The project exists but its status does not grant a report.
    #[error("Project {project_id} is not entitled to a report (status: {status})")]
    Forbidden { project_id: Uuid, status: String },

    /// A project or its calculation is missing.
    #[error("{entity} not found for project {id}")]
    NotFound { entity: MissingEntity, id: Uuid },

    /// The data store was unreachable or a query failed.
    #[error("Upstream data error: {reason}")]
    Upstream { reason: String },

    /// Template rendering or document compilation failed.
    #[error("Render error: {reason}")]
    Render { reason: String },
}

impl ReportError {
    pub fn invalid_id(reason: impl Into<String>) -> Self {
        Self::InvalidId {
            reason: reason.into(),
        }
    }

    pub fn project_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: MissingEntity::Project,
            id,
        }
    }

    pub fn calculation_not_found(project_id: Uuid) -> Self {
        Self::NotFound {
            entity: MissingEntity::Calculation,
            id: project_id,
        }
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::Upstream {
            reason: reason.into(),
        }
    }

    pub fn render(reason: impl Into<String>) -> Self {
        Self::Render {
            reason: reason.into(),
        }
    }

    /// Short label recorded as the audit outcome.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            ReportError::InvalidId { .. } => "invalid_request",
            ReportError::Forbidden { .. } => "forbidden",
            ReportError::NotFound {
                entity: MissingEntity::Project,
                ..
            } => "project_not_found",
            ReportError::NotFound {
                entity: MissingEntity::Calculation,
                ..
            } => "calculation_not_found",
            ReportError::Upstream { .. } => "upstream_error",
            ReportError::Render { .. } => "render_error",
        }
    }
}

/// Result type for HELIO core operations.
pub type ReportResult<T> = Result<T, ReportError>;
