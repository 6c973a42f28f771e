//! Lifecycle Service
//!
//! Data-subject requests: export everything stored about a project, or erase
//! it along with its calculations and cached reports.

use std::sync::Arc;

use chrono::Utc;
use helio_core::{
    Actor, AuditAction, AuditEvent, DeletionConfirmation, ExportDocument, ProjectId, ReportError,
    ReportResult,
};
use helio_storage::{record_best_effort, AuditSink, ProjectStore, ReportCache};

use super::cache_service::purge_project_variants;
use super::{failure_outcome, project_resource};

/// Export and erasure of project data.
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn ProjectStore>,
    cache: Arc<dyn ReportCache>,
    audit: Arc<dyn AuditSink>,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        cache: Arc<dyn ReportCache>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            cache,
            audit,
        }
    }

    /// Every stored field of the project and its latest calculation.
    ///
    /// A project without calculations exports with `calculation_data: null`.
    pub async fn export_data(&self, raw_id: &str, actor: Actor) -> ReportResult<ExportDocument> {
        let result = async {
            let id = ProjectId::parse(raw_id)?;
            let project = self
                .store
                .project_get(id)
                .await?
                .ok_or_else(|| ReportError::project_not_found(id.as_uuid()))?;
            let calculation = self.store.calculation_latest(id).await?;
            Ok(ExportDocument::build(&project, calculation.as_ref(), Utc::now()))
        }
        .await;

        let event = AuditEvent::new(AuditAction::ExportData, project_resource(raw_id), actor);
        let event = match &result {
            Ok(document) => {
                event.with_detail("has_calculation", document.calculation_data.is_some())
            }
            Err(e) => event.with_outcome(failure_outcome(e)),
        };
        record_best_effort(self.audit.as_ref(), &event).await;

        result
    }

    /// Erase the project and its calculations, then purge its cached reports.
    ///
    /// The rows go in one store transaction; the cache is only touched once
    /// that transaction has committed. A failed purge after a committed
    /// erasure is reported as an upstream error.
    pub async fn delete_data(
        &self,
        raw_id: &str,
        actor: Actor,
    ) -> ReportResult<DeletionConfirmation> {
        let result = self.erase(raw_id).await;

        let event = AuditEvent::new(AuditAction::DeleteData, project_resource(raw_id), actor);
        let event = match &result {
            Ok(confirmation) => {
                event.with_detail("calculations_deleted", confirmation.calculations_deleted)
            }
            Err(e) => event.with_outcome(failure_outcome(e)),
        };
        record_best_effort(self.audit.as_ref(), &event).await;

        result
    }

    async fn erase(&self, raw_id: &str) -> ReportResult<DeletionConfirmation> {
        let id = ProjectId::parse(raw_id)?;
        let report = self.store.erase_project(id).await?;

        let purged = purge_project_variants(self.cache.as_ref(), id)
            .await
            .map_err(|e| {
                tracing::error!(
                    project_id = %id,
                    error = %e,
                    "Project erased but cached reports could not be purged"
                );
                e
            })?;

        tracing::info!(
            project_id = %id,
            calculations_deleted = report.calculations_deleted,
            cache_entries_purged = purged,
            "Project data erased"
        );
        Ok(DeletionConfirmation::from_report(&report, Utc::now()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
