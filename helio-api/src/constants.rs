//! Constants for the HELIO API
//!
//! Default values used when the corresponding environment variable is unset.

// ============================================================================
// SERVICE
// ============================================================================

/// Name reported by the health endpoint
pub const DEFAULT_SERVICE_NAME: &str = "pdf-generation-service";

/// Default listen port
pub const DEFAULT_API_PORT: u16 = 3000;

// ============================================================================
// REPORT CACHE
// ============================================================================

/// Lifetime of a cached report in seconds (1 hour)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Reports held by the in-memory cache before it evicts
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Default directory of the shared LMDB cache
pub const DEFAULT_CACHE_LMDB_PATH: &str = "./data/report-cache";

/// Default LMDB map size in megabytes
pub const DEFAULT_CACHE_LMDB_MAX_MB: usize = 512;

// ============================================================================
// RATE LIMITING
// ============================================================================

/// Window every per-route budget is counted over
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Report downloads per client per window
pub const DEFAULT_RATE_LIMIT_DOWNLOAD: u32 = 10;

/// Cache administration calls per client per window
pub const DEFAULT_RATE_LIMIT_CACHE: u32 = 30;

/// Erasure requests per client per window
pub const DEFAULT_RATE_LIMIT_PRIVACY: u32 = 5;

/// Export requests per client per window
pub const DEFAULT_RATE_LIMIT_EXPORT: u32 = 10;

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// REPORTS
// ============================================================================

/// Prefix of every downloaded report's file name
pub const REPORT_FILENAME_PREFIX: &str = "solar_report";

/// Longest project-name fragment kept in a download file name
pub const MAX_FILENAME_NAME_CHARS: usize = 64;
