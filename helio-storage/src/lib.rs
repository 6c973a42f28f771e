//! HELIO Storage - Store, Cache and Audit Abstractions
//!
//! Defines the narrow interfaces the report service depends on and their
//! process-local implementations. The PostgreSQL adapter lives in helio-api.

pub mod audit;
pub mod cache;
pub mod store;

pub use audit::{
    record_best_effort, AuditError, AuditSink, FanoutAuditSink, InMemoryAuditSink,
    JsonLinesAuditSink, TracingAuditSink,
};
pub use cache::{
    CacheStats, InMemoryReportCache, LmdbCacheError, LmdbReportCache, ReportCache, ReportCacheKey,
};
pub use store::{InMemoryProjectStore, ProjectStore, StoreOperation};
