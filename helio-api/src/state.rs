//! Shared application state for Axum routers.

use std::sync::Arc;

use helio_storage::{
    AuditSink, FanoutAuditSink, InMemoryReportCache, JsonLinesAuditSink, LmdbReportCache,
    ProjectStore, ReportCache, TracingAuditSink,
};

use crate::config::{ApiConfig, CacheBackend};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{RateLimitState, RouteRateLimiter};
use crate::render::RenderPipeline;
use crate::services::{CacheService, LifecycleService, ReportService};

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    /// Upstream project database; the health check pings it directly.
    pub store: Arc<dyn ProjectStore>,
    pub reports: ReportService,
    pub cache_admin: CacheService,
    pub lifecycle: LifecycleService,
    pub rate_limit: RateLimitState,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire the services over one store, cache, render pipeline and audit
    /// sink.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn ProjectStore>,
        cache: Arc<dyn ReportCache>,
        pipeline: RenderPipeline,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let limiter = Arc::new(RouteRateLimiter::new(&config));
        let reports = ReportService::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::new(pipeline),
            Arc::clone(&audit),
            config.cache_ttl,
        );
        let cache_admin = CacheService::new(Arc::clone(&cache), Arc::clone(&audit));
        let lifecycle = LifecycleService::new(Arc::clone(&store), cache, Arc::clone(&audit));

        Self {
            config: Arc::new(config),
            store,
            reports,
            cache_admin,
            lifecycle,
            rate_limit: RateLimitState::new(limiter, audit),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Open the configured report cache.
pub fn open_report_cache(backend: &CacheBackend) -> ApiResult<Arc<dyn ReportCache>> {
    match backend {
        CacheBackend::Memory { max_entries } => {
            tracing::info!(max_entries, "Report cache: in-memory");
            Ok(Arc::new(InMemoryReportCache::with_max_entries(*max_entries)))
        }
        CacheBackend::Lmdb { path, max_size_mb } => {
            tracing::info!(path = %path.display(), max_size_mb, "Report cache: LMDB");
            let cache = LmdbReportCache::open(path, *max_size_mb).map_err(|e| {
                ApiError::internal_error(format!("Failed to open report cache: {}", e))
            })?;
            Ok(Arc::new(cache))
        }
    }
}

/// Open the audit sink: tracing always, plus a JSON-lines file when
/// `audit_log_path` is set.
pub async fn open_audit_sink(config: &ApiConfig) -> ApiResult<Arc<dyn AuditSink>> {
    let tracing_sink: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    match &config.audit_log_path {
        Some(path) => {
            let file = JsonLinesAuditSink::open(path).await.map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to open audit log {}: {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::info!(path = %path.display(), "Audit trail: tracing + JSON lines");
            Ok(Arc::new(
                FanoutAuditSink::new(vec![tracing_sink]).with_sink(Arc::new(file)),
            ))
        }
        None => Ok(tracing_sink),
    }
}

crate::impl_from_ref! {
    Arc<ApiConfig> => config,
    Arc<dyn ProjectStore> => store,
    ReportService => reports,
    CacheService => cache_admin,
    LifecycleService => lifecycle,
    RateLimitState => rate_limit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_core::{Actor, AuditAction, AuditEvent};

    #[tokio::test]
    async fn test_audit_sink_writes_configured_file() -> Result<(), String> {
        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        let path = dir.path().join("audit").join("events.jsonl");
        let config = ApiConfig {
            audit_log_path: Some(path.clone()),
            ..ApiConfig::default()
        };

        let sink = open_audit_sink(&config).await.map_err(|e| e.message)?;
        let event = AuditEvent::new(AuditAction::ClearAllCache, "cache", Actor::anonymous());
        sink.record(&event).await.map_err(|e| e.to_string())?;

        let written = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains("clear_all_cache"));
        Ok(())
    }

    #[test]
    fn test_lmdb_cache_opens_in_directory() -> Result<(), String> {
        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        let backend = CacheBackend::Lmdb {
            path: dir.path().join("cache"),
            max_size_mb: 16,
        };
        open_report_cache(&backend).map_err(|e| e.message)?;
        Ok(())
    }
}
