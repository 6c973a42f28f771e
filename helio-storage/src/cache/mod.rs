//! Rendered-report cache.
//!
//! Entries are never invalidated when the underlying project or calculation
//! changes. They stay servable until their TTL elapses or they are purged
//! explicitly (cache administration endpoints, data erasure).
//!
//! Two backends are provided: [`InMemoryReportCache`] for a single process,
//! and [`LmdbReportCache`] for several processes on one host sharing a
//! memory-mapped environment.

pub mod key;
pub mod lmdb;
pub mod memory;
pub mod traits;

pub use key::ReportCacheKey;
pub use lmdb::{LmdbCacheError, LmdbReportCache};
pub use memory::InMemoryReportCache;
pub use traits::{CacheStats, ReportCache};
