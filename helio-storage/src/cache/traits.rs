//! Report cache trait and statistics.

use async_trait::async_trait;
use bytes::Bytes;
use helio_core::ReportResult;
use std::time::Duration;

/// Key/value store for rendered report bytes with per-entry expiry.
///
/// Keys are opaque strings; callers derive them with
/// [`ReportCacheKey`](super::ReportCacheKey). An expired entry behaves
/// exactly like a missing one. Implementations must be safe for concurrent
/// use from many request tasks.
#[async_trait]
pub trait ReportCache: Send + Sync {
    /// Get a live entry.
    async fn get(&self, key: &str) -> ReportResult<Option<Bytes>>;

    /// Store an entry that expires after `ttl`, replacing any previous one.
    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> ReportResult<()>;

    /// Remove one entry. Returns whether an entry was present.
    async fn delete(&self, key: &str) -> ReportResult<bool>;

    /// Remove every entry regardless of key. Returns how many were removed.
    async fn clear(&self) -> ReportResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> ReportResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries currently stored, expired ones included until they are
    /// next touched.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
