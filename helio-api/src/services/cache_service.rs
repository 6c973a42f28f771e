//! Cache Service
//!
//! Administrative purges of the report cache.

use std::sync::Arc;

use helio_core::{Actor, AuditAction, AuditEvent, ProjectId, ReportError, ReportResult};
use helio_storage::{record_best_effort, AuditSink, ReportCache, ReportCacheKey};

use super::{failure_outcome, project_resource};

/// Remove every cached variant of one project's report.
///
/// Returns the number of entries that were present.
pub(crate) async fn purge_project_variants(
    cache: &dyn ReportCache,
    id: ProjectId,
) -> ReportResult<u64> {
    let mut removed = 0;
    for key in ReportCacheKey::variants(id) {
        if cache.delete(&key.encode()).await? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Purges cached reports on request.
#[derive(Clone)]
pub struct CacheService {
    cache: Arc<dyn ReportCache>,
    audit: Arc<dyn AuditSink>,
}

impl CacheService {
    pub fn new(cache: Arc<dyn ReportCache>, audit: Arc<dyn AuditSink>) -> Self {
        Self { cache, audit }
    }

    /// Drop every cached variant of one project's report.
    ///
    /// Succeeds whether or not anything was cached.
    pub async fn clear_cache(&self, raw_id: &str, actor: Actor) -> ReportResult<String> {
        let result = async {
            let id = ProjectId::parse(raw_id)?;
            let removed = purge_project_variants(self.cache.as_ref(), id).await?;
            Ok::<_, ReportError>((id, removed))
        }
        .await;

        let event = AuditEvent::new(AuditAction::ClearCache, project_resource(raw_id), actor);
        let event = match &result {
            Ok((_, removed)) => event.with_detail("entries_removed", *removed),
            Err(e) => event.with_outcome(failure_outcome(e)),
        };
        record_best_effort(self.audit.as_ref(), &event).await;

        let (id, removed) = result?;
        tracing::info!(project_id = %id, entries_removed = removed, "Report cache cleared");
        Ok(format!("Cache cleared for project {}", id))
    }

    /// Drop every cached report.
    pub async fn clear_all(&self, actor: Actor) -> ReportResult<String> {
        let result = self.cache.clear().await;

        let event = AuditEvent::new(AuditAction::ClearAllCache, "cache", actor);
        let event = match &result {
            Ok(removed) => event.with_detail("entries_removed", *removed),
            Err(e) => event.with_outcome(failure_outcome(e)),
        };
        record_best_effort(self.audit.as_ref(), &event).await;

        let removed = result?;
        tracing::info!(entries_removed = removed, "All report caches cleared");
        Ok("All PDF caches cleared".to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
