//! Report Service
//!
//! Entitlement-gated report downloads and availability checks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::Utc;
use helio_core::{
    assemble, Actor, AuditAction, AuditEvent, CalculationRecord, ProjectId, ProjectRecord,
    ReportError, ReportFormat, ReportResult, UNNAMED_PROJECT,
};
use helio_storage::{record_best_effort, AuditSink, ProjectStore, ReportCache, ReportCacheKey};

use super::{failure_outcome, project_resource};
use crate::constants::{MAX_FILENAME_NAME_CHARS, REPORT_FILENAME_PREFIX};
use crate::render::RenderPipeline;
use crate::telemetry::metrics::with_metrics;

/// Query values that switch the financial section off.
const FALSE_VALUES: [&str; 4] = ["false", "0", "no", "off"];

/// Which variant of a report a client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub format: ReportFormat,
    pub include_financial: bool,
}

impl ReportRequest {
    pub fn new(format: ReportFormat, include_financial: bool) -> Self {
        Self {
            format,
            include_financial,
        }
    }

    /// Build from the raw `format` and `include_financial` query values.
    pub fn from_query(format: Option<&str>, include_financial: Option<&str>) -> Self {
        Self::new(
            ReportFormat::from_query(format),
            parse_include_financial(include_financial),
        )
    }
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self::new(ReportFormat::Detailed, true)
    }
}

/// `false`, `0`, `no` and `off` (any case) disable the financial section;
/// anything else, including absence, enables it.
pub fn parse_include_financial(raw: Option<&str>) -> bool {
    match raw {
        Some(value) => {
            let value = value.trim().to_ascii_lowercase();
            !FALSE_VALUES.contains(&value.as_str())
        }
        None => true,
    }
}

/// A report ready to send.
#[derive(Debug, Clone)]
pub struct ReportDownload {
    pub bytes: Bytes,
    pub filename: String,
    pub format: ReportFormat,
    pub cache_hit: bool,
}

/// Attachment file name for a report: `solar_report_{name}_{id}_{format}.pdf`.
///
/// Whitespace in the project name becomes `_`; anything that is not ASCII
/// alphanumeric, `-` or `_` is dropped.
pub fn download_filename(project_name: &str, id: ProjectId, format: ReportFormat) -> String {
    let mut name: String = project_name
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .take(MAX_FILENAME_NAME_CHARS)
        .collect();
    if name.is_empty() {
        name.push_str("project");
    }
    format!("{}_{}_{}_{}.pdf", REPORT_FILENAME_PREFIX, name, id, format)
}

/// Serves rendered reports for paid projects, through the report cache.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ProjectStore>,
    cache: Arc<dyn ReportCache>,
    pipeline: Arc<RenderPipeline>,
    audit: Arc<dyn AuditSink>,
    cache_ttl: Duration,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        cache: Arc<dyn ReportCache>,
        pipeline: Arc<RenderPipeline>,
        audit: Arc<dyn AuditSink>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            pipeline,
            audit,
            cache_ttl,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Fetch or generate the report for a project.
    ///
    /// Checks run in order: identifier, project existence, entitlement,
    /// latest calculation. Only then is the cache consulted; a miss assembles,
    /// renders and caches the report for the configured TTL.
    ///
    /// # Errors
    ///
    /// `InvalidId` for a malformed id, `NotFound` for a missing project or
    /// calculation, `Forbidden` for an unpaid project, `Upstream` for store or
    /// cache failures and `Render` when the pipeline fails.
    pub async fn get_report(
        &self,
        raw_id: &str,
        request: ReportRequest,
        actor: Actor,
    ) -> ReportResult<ReportDownload> {
        let result = self.fetch_report(raw_id, request).await;

        let mut event = AuditEvent::new(AuditAction::DownloadReport, project_resource(raw_id), actor)
            .with_detail("format", request.format.as_str())
            .with_detail("include_financial", request.include_financial);
        event = match &result {
            Ok(download) => event.with_detail("cache", if download.cache_hit { "hit" } else { "miss" }),
            Err(e) => event.with_outcome(failure_outcome(e)),
        };
        record_best_effort(self.audit.as_ref(), &event).await;

        result
    }

    /// Whether a report could be served for the project, without rendering.
    pub async fn head_availability(&self, raw_id: &str, actor: Actor) -> ReportResult<()> {
        let result = async {
            let id = ProjectId::parse(raw_id)?;
            self.available_inputs(id).await.map(|_| ())
        }
        .await;

        let mut event =
            AuditEvent::new(AuditAction::CheckAvailability, project_resource(raw_id), actor);
        if let Err(e) = &result {
            event = event.with_outcome(failure_outcome(e));
        }
        record_best_effort(self.audit.as_ref(), &event).await;

        result
    }

    /// Project and latest calculation, once both exist and the project is
    /// entitled.
    async fn available_inputs(
        &self,
        id: ProjectId,
    ) -> ReportResult<(ProjectRecord, CalculationRecord)> {
        let project = self
            .store
            .project_get(id)
            .await?
            .ok_or_else(|| ReportError::project_not_found(id.as_uuid()))?;

        if !project.is_entitled() {
            return Err(ReportError::Forbidden {
                project_id: id.as_uuid(),
                status: project.status.to_string(),
            });
        }

        let calculation = self
            .store
            .calculation_latest(id)
            .await?
            .ok_or_else(|| ReportError::calculation_not_found(id.as_uuid()))?;

        Ok((project, calculation))
    }

    async fn fetch_report(&self, raw_id: &str, request: ReportRequest) -> ReportResult<ReportDownload> {
        let id = ProjectId::parse(raw_id)?;
        let (project, calculation) = self.available_inputs(id).await?;

        let filename = download_filename(
            project.name.as_deref().unwrap_or(UNNAMED_PROJECT),
            id,
            request.format,
        );
        let key = ReportCacheKey::new(id, request.format, request.include_financial).encode();

        if let Some(bytes) = self.cache.get(&key).await? {
            with_metrics(|m| m.record_cache_lookup(true));
            tracing::debug!(project_id = %id, key = %key, "Report served from cache");
            return Ok(ReportDownload {
                bytes,
                filename,
                format: request.format,
                cache_hit: true,
            });
        }
        with_metrics(|m| m.record_cache_lookup(false));

        let model = assemble(&project, &calculation, request.include_financial, Utc::now());
        let start = Instant::now();
        let rendered = self.pipeline.produce(model, request.format).await;
        let elapsed = start.elapsed().as_secs_f64();
        with_metrics(|m| m.record_render(request.format.as_str(), rendered.is_ok(), elapsed));
        let bytes = rendered?;

        // A report that cannot be cached is still served.
        if let Err(e) = self.cache.set(&key, bytes.clone(), self.cache_ttl).await {
            tracing::warn!(project_id = %id, key = %key, error = %e, "Failed to cache report");
        }

        tracing::info!(
            project_id = %id,
            format = %request.format,
            include_financial = request.include_financial,
            size_bytes = bytes.len(),
            "Report generated"
        );

        Ok(ReportDownload {
            bytes,
            filename,
            format: request.format,
            cache_hit: false,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BuiltinTemplates, DocumentCompiler, RenderError};
    use helio_core::{AuditOutcome, ProjectStatus};
    use helio_storage::{InMemoryAuditSink, InMemoryProjectStore, InMemoryReportCache};
    use helio_test_utils::fixtures::{calculation_for, paid_project, project_with_status};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCompiler(AtomicUsize);

    impl DocumentCompiler for CountingCompiler {
        fn compile(&self, markup: &str) -> Result<Bytes, RenderError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(markup.to_string()))
        }
    }

    struct Harness {
        service: ReportService,
        store: Arc<InMemoryProjectStore>,
        compiler: Arc<CountingCompiler>,
        audit: Arc<InMemoryAuditSink>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryProjectStore::new());
        let compiler = Arc::new(CountingCompiler(AtomicUsize::new(0)));
        let audit = Arc::new(InMemoryAuditSink::new());
        let pipeline = RenderPipeline::new(Arc::new(BuiltinTemplates::new()), compiler.clone());
        let service = ReportService::new(
            store.clone(),
            Arc::new(InMemoryReportCache::new()),
            Arc::new(pipeline),
            audit.clone(),
            Duration::from_secs(3600),
        );
        Harness {
            service,
            store,
            compiler,
            audit,
        }
    }

    #[test]
    fn test_parse_include_financial() {
        assert!(parse_include_financial(None));
        assert!(parse_include_financial(Some("true")));
        assert!(parse_include_financial(Some("yes")));
        assert!(parse_include_financial(Some("")));
        for value in ["false", "FALSE", "0", "no", "Off", " off "] {
            assert!(!parse_include_financial(Some(value)), "{value:?}");
        }
    }

    #[test]
    fn test_download_filename_sanitises_name() {
        let id = ProjectId::new(uuid::Uuid::nil());
        assert_eq!(
            download_filename("Rooftop Array #2 (west)", id, ReportFormat::Summary),
            format!("solar_report_Rooftop_Array_2_west_{}_summary.pdf", id)
        );
        assert_eq!(
            download_filename("  ", id, ReportFormat::Detailed),
            format!("solar_report_project_{}_detailed.pdf", id)
        );
        assert!(!download_filename("a\"b/c", id, ReportFormat::Detailed).contains('"'));
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() -> ReportResult<()> {
        let h = harness();
        let project = paid_project("Cache Test");
        let id = project.id;
        h.store.insert_project(project).await;
        h.store.insert_calculation(calculation_for(id)).await?;

        let raw = id.to_string();
        let first = h
            .service
            .get_report(&raw, ReportRequest::default(), Actor::anonymous())
            .await?;
        let second = h
            .service
            .get_report(&raw, ReportRequest::default(), Actor::anonymous())
            .await?;

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(h.compiler.0.load(Ordering::SeqCst), 1);
        assert_eq!(h.audit.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_unpaid_project_is_forbidden_before_calculation_lookup() {
        let h = harness();
        let project = project_with_status(ProjectStatus::Pending);
        let raw = project.id.to_string();
        h.store.insert_project(project).await;

        let err = h
            .service
            .get_report(&raw, ReportRequest::default(), Actor::anonymous())
            .await
            .err();
        assert!(matches!(err, Some(ReportError::Forbidden { .. })));
        assert_eq!(h.compiler.0.load(Ordering::SeqCst), 0);

        let events = h.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::failure(403, "forbidden"));
    }

    #[tokio::test]
    async fn test_malformed_id_is_audited() {
        let h = harness();
        let result = h
            .service
            .head_availability("not-a-uuid", Actor::anonymous())
            .await;

        assert!(matches!(result, Err(ReportError::InvalidId { .. })));
        let events = h.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::CheckAvailability);
        assert_eq!(events[0].outcome.status, 400);
    }

    #[tokio::test]
    async fn test_availability_does_not_render() -> ReportResult<()> {
        let h = harness();
        let project = paid_project("Head Test");
        let id = project.id;
        h.store.insert_project(project).await;

        let missing = h
            .service
            .head_availability(&id.to_string(), Actor::anonymous())
            .await;
        assert!(matches!(missing, Err(ReportError::NotFound { .. })));

        h.store.insert_calculation(calculation_for(id)).await?;
        h.service
            .head_availability(&id.to_string(), Actor::anonymous())
            .await?;
        assert_eq!(h.compiler.0.load(Ordering::SeqCst), 0);
        Ok(())
    }
}
