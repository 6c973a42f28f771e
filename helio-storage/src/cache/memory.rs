//! Process-local report cache.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use helio_core::ReportResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::traits::{CacheStats, ReportCache};

#[derive(Debug, Clone)]
struct CachedReport {
    payload: Bytes,
    expires_at: Instant,
}

impl CachedReport {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Entries the cache holds before evicting, unless configured otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Number of writes between two sweeps of expired entries.
const DEFAULT_SWEEP_EVERY: u64 = 256;

/// DashMap-backed cache with per-entry expiry.
///
/// A read that finds an expired entry drops it. Entries nobody reads again
/// are dropped by a sweep that runs every `sweep_every` writes, and whenever
/// a write takes the cache past `max_entries`. If the cache is still full
/// after sweeping, the entries closest to expiry are evicted.
#[derive(Debug)]
pub struct InMemoryReportCache {
    entries: DashMap<String, CachedReport>,
    max_entries: usize,
    sweep_every: u64,
    writes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for InMemoryReportCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `max_entries` reports (at least one).
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            sweep_every: DEFAULT_SWEEP_EVERY,
            writes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Sweep expired entries every `writes` writes.
    pub fn with_sweep_every(mut self, writes: u64) -> Self {
        self.sweep_every = writes.max(1);
        self
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry, returning how many went.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Evict the entries closest to expiry until the cache fits its bound.
    fn evict_overflow(&self) -> usize {
        let overflow = self.entries.len().saturating_sub(self.max_entries);
        if overflow == 0 {
            return 0;
        }

        let mut by_expiry: Vec<(Instant, String)> = self
            .entries
            .iter()
            .map(|entry| (entry.value().expires_at, entry.key().clone()))
            .collect();
        by_expiry.sort();

        by_expiry
            .into_iter()
            .take(overflow)
            .filter(|(expires_at, key)| {
                self.entries
                    .remove_if(key, |_, entry| entry.expires_at == *expires_at)
                    .is_some()
            })
            .count()
    }

    fn after_write(&self) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        let over_capacity = self.entries.len() > self.max_entries;
        if writes % self.sweep_every != 0 && !over_capacity {
            return;
        }

        let expired = self.sweep_expired();
        let evicted = self.evict_overflow();
        if expired > 0 || evicted > 0 {
            tracing::debug!(expired, evicted, remaining = self.entries.len(), "Report cache swept");
        }
    }
}

#[async_trait]
impl ReportCache for InMemoryReportCache {
    async fn get(&self, key: &str) -> ReportResult<Option<Bytes>> {
        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.payload.clone()));

        match live {
            Some(Some(payload)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(payload))
            }
            Some(None) => {
                // Only drop it if nobody refreshed the entry in between.
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> ReportResult<()> {
        self.entries.insert(
            key.to_string(),
            CachedReport {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
        self.after_write();
        Ok(())
    }

    async fn delete(&self, key: &str) -> ReportResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn clear(&self) -> ReportResult<u64> {
        let removed = self.entries.len() as u64;
        self.entries.clear();
        Ok(removed)
    }

    async fn stats(&self) -> ReportResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryReportCache::new();
        cache
            .set("k", Bytes::from_static(b"%PDF"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(Bytes::from_static(b"%PDF")));
        assert_eq!(cache.get("other").await.unwrap(), None);

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = InMemoryReportCache::new();
        cache
            .set("k", Bytes::from_static(b"old"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = InMemoryReportCache::new();
        for key in ["a", "b", "c"] {
            cache
                .set(key, Bytes::from_static(b"x"), Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert!(cache.delete("a").await.unwrap());
        assert!(!cache.delete("a").await.unwrap());
        assert_eq!(cache.clear().await.unwrap(), 2);
        assert_eq!(cache.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unread_expired_entries_are_swept_on_write() {
        let cache = InMemoryReportCache::with_max_entries(1_000).with_sweep_every(50);
        for i in 0..49 {
            cache
                .set(&format!("short-{i}"), Bytes::from_static(b"x"), Duration::from_millis(1))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 49);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .set("fresh", Bytes::from_static(b"y"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh").await.unwrap(), Some(Bytes::from_static(b"y")));
    }

    #[tokio::test]
    async fn test_full_cache_sweeps_before_growing() {
        let cache = InMemoryReportCache::with_max_entries(10_000).with_sweep_every(u64::MAX);
        for i in 0..10_000 {
            cache
                .set(&format!("short-{i}"), Bytes::from_static(b"x"), Duration::from_millis(1))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .set("fresh", Bytes::from_static(b"y"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_live_overflow_evicts_soonest_expiring() {
        let cache = InMemoryReportCache::with_max_entries(3);
        for (key, secs) in [("a", 10), ("b", 40), ("c", 30), ("d", 20)] {
            cache
                .set(key, Bytes::from_static(b"x"), Duration::from_secs(secs))
                .await
                .unwrap();
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("a").await.unwrap(), None);
        for key in ["b", "c", "d"] {
            assert!(cache.get(key).await.unwrap().is_some(), "{key}");
        }
    }
}
