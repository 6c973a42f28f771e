//! Service Layer
//!
//! Request-level operations behind the HTTP routes. Every operation takes the
//! raw path identifier, validates it itself and records exactly one audit
//! event for the attempt, whatever its outcome.

mod cache_service;
mod lifecycle_service;
mod report_service;

pub use cache_service::*;
pub use lifecycle_service::*;
pub use report_service::*;

use helio_core::{AuditOutcome, ReportError};

use crate::error::ErrorCode;

/// Audit outcome for a failed operation: the status the client receives and
/// the error's short label.
pub(crate) fn failure_outcome(err: &ReportError) -> AuditOutcome {
    let status = ErrorCode::for_report_error(err).status_code();
    AuditOutcome::failure(status.as_u16(), err.outcome_label())
}

/// Audit resource name for a project path identifier.
pub(crate) fn project_resource(raw_id: &str) -> String {
    format!("project/{}", raw_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_failure_outcome_uses_client_status() {
        let outcome = failure_outcome(&ReportError::project_not_found(Uuid::nil()));
        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.label, "project_not_found");

        let outcome = failure_outcome(&ReportError::upstream("connection refused"));
        assert_eq!(outcome.status, 500);
        assert!(!outcome.is_success());
    }
}
