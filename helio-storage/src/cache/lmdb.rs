//! LMDB-backed report cache.
//!
//! Uses the heed crate (Rust bindings for LMDB) so that every worker process
//! on a host opening the same directory sees one cache: a purge in one
//! process is observed by all others.
//!
//! # Value Format
//!
//! `[expires_at: 8 bytes, little-endian unix millis][report bytes]`
//!
//! Expiry is checked on read; an expired entry is deleted and reported as a
//! miss. Hit/miss counters are per process.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use heed::types::Bytes as RawBytes;
use heed::{Database, Env, EnvOpenOptions};
use helio_core::{ReportError, ReportResult};

use super::traits::{CacheStats, ReportCache};

const EXPIRY_PREFIX_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for ReportError {
    fn from(e: LmdbCacheError) -> Self {
        ReportError::upstream(format!("report cache: {e}"))
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// Report cache stored in an LMDB environment.
pub struct LmdbReportCache {
    env: Env,
    db: Database<RawBytes, RawBytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LmdbReportCache {
    /// Open (or create) the cache at `path`, sized to `max_size_mb`.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per process for this path
        // and never opened twice concurrently from the same process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<RawBytes, RawBytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn encode_value(payload: &[u8], expires_at_millis: i64) -> Vec<u8> {
        let mut value = Vec::with_capacity(EXPIRY_PREFIX_LEN + payload.len());
        value.extend_from_slice(&expires_at_millis.to_le_bytes());
        value.extend_from_slice(payload);
        value
    }

    /// Split a stored value into expiry and payload. Truncated values are
    /// treated as already expired.
    fn decode_value(raw: &[u8]) -> (i64, &[u8]) {
        match raw
            .get(..EXPIRY_PREFIX_LEN)
            .and_then(|prefix| <[u8; EXPIRY_PREFIX_LEN]>::try_from(prefix).ok())
        {
            Some(prefix) => (i64::from_le_bytes(prefix), &raw[EXPIRY_PREFIX_LEN..]),
            None => (i64::MIN, &[]),
        }
    }

    fn remove_key(&self, key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self.db.delete(&mut wtxn, key).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    /// Delete `key` only if the stored entry is still expired at `now_millis`.
    ///
    /// Expiry is re-read inside the write transaction, so an entry rewritten
    /// by a `set` since the caller's read survives.
    fn remove_if_expired(&self, key: &[u8], now_millis: i64) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let expired = match self.db.get(&wtxn, key).map_err(txn_err)? {
            Some(raw) => Self::decode_value(raw).0 <= now_millis,
            None => false,
        };
        if !expired {
            wtxn.abort();
            return Ok(false);
        }
        let deleted = self.db.delete(&mut wtxn, key).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    fn miss(&self) -> ReportResult<Option<Bytes>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }
}

#[async_trait]
impl ReportCache for LmdbReportCache {
    async fn get(&self, key: &str) -> ReportResult<Option<Bytes>> {
        let now_millis = Utc::now().timestamp_millis();

        let found = {
            let rtxn = self.env.read_txn().map_err(txn_err)?;
            let entry = self
                .db
                .get(&rtxn, key.as_bytes())
                .map_err(txn_err)?
                .map(|raw| {
                    let (expires_at, payload) = Self::decode_value(raw);
                    (expires_at, Bytes::copy_from_slice(payload))
                });
            entry
        };

        match found {
            Some((expires_at, payload)) if now_millis < expires_at => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(payload))
            }
            Some(_) => {
                self.remove_if_expired(key.as_bytes(), now_millis)?;
                self.miss()
            }
            None => self.miss(),
        }
    }

    async fn set(&self, key: &str, payload: Bytes, ttl: Duration) -> ReportResult<()> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_millis);
        let value = Self::encode_value(&payload, expires_at);

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &value)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> ReportResult<bool> {
        Ok(self.remove_key(key.as_bytes())?)
    }

    async fn clear(&self) -> ReportResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let removed = self.db.len(&wtxn).map_err(txn_err)?;
        self.db.clear(&mut wtxn).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(removed)
    }

    async fn stats(&self) -> ReportResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_err)?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        })
    }
}
