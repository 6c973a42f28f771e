//! HELIO API - Report Access Service
//!
//! HTTP layer over the Helio domain: entitlement-gated PDF report downloads
//! served through a TTL cache, cache administration, data-subject export and
//! erasure, per-route rate limiting and a best-effort audit trail.
//!
//! Project data comes from PostgreSQL through [`db::PgProjectStore`]; reports
//! are rendered in-process by [`render::RenderPipeline`].

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, CacheBackend};
pub use db::{DbConfig, PgProjectStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::{ClientActor, RawProjectId};
pub use middleware::{rate_limit_middleware, RateLimitState, RouteClass, RouteRateLimiter};
pub use render::{DocumentCompiler, PdfCompiler, RenderError, RenderPipeline, TemplateRenderer};
pub use routes::create_router;
pub use services::{
    download_filename, parse_include_financial, CacheService, LifecycleService, ReportDownload,
    ReportRequest, ReportService,
};
pub use state::{open_audit_sink, open_report_cache, AppState};
