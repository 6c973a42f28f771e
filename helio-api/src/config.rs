//! API Configuration Module
//!
//! Configuration for the report cache, rate limiting, audit trail and CORS.
//! Values are loaded from environment variables with development defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_LMDB_MAX_MB, DEFAULT_CACHE_LMDB_PATH, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_RATE_LIMIT_CACHE,
    DEFAULT_RATE_LIMIT_DOWNLOAD, DEFAULT_RATE_LIMIT_EXPORT, DEFAULT_RATE_LIMIT_PRIVACY,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_SERVICE_NAME,
};

// ============================================================================
// CACHE BACKEND
// ============================================================================

/// Where rendered reports are cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// Process-local map bounded to `max_entries`; each worker has its own cache.
    Memory { max_entries: usize },
    /// LMDB environment shared by every process that opens `path`.
    Lmdb { path: PathBuf, max_size_mb: usize },
}

impl CacheBackend {
    fn from_env() -> Self {
        let backend = std::env::var("HELIO_CACHE_BACKEND")
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();

        match backend.as_str() {
            "lmdb" => CacheBackend::Lmdb {
                path: std::env::var("HELIO_CACHE_LMDB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_LMDB_PATH)),
                max_size_mb: env_parse("HELIO_CACHE_LMDB_MAX_MB", DEFAULT_CACHE_LMDB_MAX_MB),
            },
            _ => CacheBackend::Memory {
                max_entries: env_parse("HELIO_CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES),
            },
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Name reported by the health endpoint.
    pub service_name: String,

    // ========================================================================
    // Report Cache
    // ========================================================================
    /// Lifetime of a cached report.
    pub cache_ttl: Duration,

    pub cache_backend: CacheBackend,

    // ========================================================================
    // Rate Limiting
    // ========================================================================
    /// Whether rate limiting is enabled.
    pub rate_limit_enabled: bool,

    /// Window every per-route limit is counted over.
    pub rate_limit_window: Duration,

    /// Report downloads per client per window.
    pub rate_limit_download: u32,

    /// Cache administration calls per client per window.
    pub rate_limit_cache: u32,

    /// Erasure requests per client per window.
    pub rate_limit_privacy: u32,

    /// Export requests per client per window.
    pub rate_limit_export: u32,

    // ========================================================================
    // Audit Trail
    // ========================================================================
    /// JSON-lines audit file. `None` logs audit events through tracing only.
    pub audit_log_path: Option<PathBuf>,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_backend: CacheBackend::Memory {
                max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            },
            rate_limit_enabled: true,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            rate_limit_download: DEFAULT_RATE_LIMIT_DOWNLOAD,
            rate_limit_cache: DEFAULT_RATE_LIMIT_CACHE,
            rate_limit_privacy: DEFAULT_RATE_LIMIT_PRIVACY,
            rate_limit_export: DEFAULT_RATE_LIMIT_EXPORT,
            audit_log_path: None,
            cors_origins: Vec::new(),
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `HELIO_SERVICE_NAME`: Name reported by `/health` (default: pdf-generation-service)
    /// - `HELIO_CACHE_TTL_SECS`: Cached report lifetime (default: 3600)
    /// - `HELIO_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `HELIO_CACHE_MAX_ENTRIES`: Reports held by the memory cache (default: 10000)
    /// - `HELIO_CACHE_LMDB_PATH` / `HELIO_CACHE_LMDB_MAX_MB`: LMDB location and map size
    /// - `HELIO_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `HELIO_RATE_LIMIT_WINDOW_SECS`: Window length (default: 60)
    /// - `HELIO_RATE_LIMIT_DOWNLOAD` / `_CACHE` / `_PRIVACY` / `_EXPORT`: Per-route limits
    /// - `HELIO_AUDIT_LOG_PATH`: JSON-lines audit file (default: unset)
    /// - `HELIO_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let service_name = std::env::var("HELIO_SERVICE_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.service_name);

        let cors_origins = std::env::var("HELIO_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let rate_limit_enabled = std::env::var("HELIO_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let audit_log_path = std::env::var("HELIO_AUDIT_LOG_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            service_name,
            cache_ttl: Duration::from_secs(env_parse("HELIO_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)),
            cache_backend: CacheBackend::from_env(),
            rate_limit_enabled,
            rate_limit_window: Duration::from_secs(
                env_parse("HELIO_RATE_LIMIT_WINDOW_SECS", DEFAULT_RATE_LIMIT_WINDOW_SECS).max(1),
            ),
            rate_limit_download: env_parse("HELIO_RATE_LIMIT_DOWNLOAD", DEFAULT_RATE_LIMIT_DOWNLOAD),
            rate_limit_cache: env_parse("HELIO_RATE_LIMIT_CACHE", DEFAULT_RATE_LIMIT_CACHE),
            rate_limit_privacy: env_parse("HELIO_RATE_LIMIT_PRIVACY", DEFAULT_RATE_LIMIT_PRIVACY),
            rate_limit_export: env_parse("HELIO_RATE_LIMIT_EXPORT", DEFAULT_RATE_LIMIT_EXPORT),
            audit_log_path,
            cors_origins,
            cors_max_age_secs: env_parse("HELIO_CORS_MAX_AGE_SECS", DEFAULT_CORS_MAX_AGE_SECS),
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(pattern)
                        || origin_domain == pattern.strip_prefix('.').unwrap_or(pattern);
                }
            }
            false
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.service_name, "pdf-generation-service");
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(
            config.cache_backend,
            CacheBackend::Memory {
                max_entries: DEFAULT_CACHE_MAX_ENTRIES
            }
        );
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.rate_limit_download, 10);
        assert_eq!(config.rate_limit_cache, 30);
        assert_eq!(config.rate_limit_privacy, 5);
        assert_eq!(config.rate_limit_export, 10);
        assert!(config.audit_log_path.is_none());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_download_limit_is_strictest_read_route() {
        let config = ApiConfig::default();
        assert!(config.rate_limit_download < config.rate_limit_cache);
    }

    #[test]
    fn test_is_production() {
        let mut config = ApiConfig::default();
        assert!(!config.is_production());

        config.cors_origins = vec!["https://reports.example.com".to_string()];
        assert!(config.is_production());
    }

    #[test]
    fn test_origin_allowed_production() {
        let mut config = ApiConfig::default();
        config.cors_origins = vec![
            "https://example.com".to_string(),
            "*.reports.example.com".to_string(),
        ];

        assert!(config.is_origin_allowed("https://example.com"));
        assert!(config.is_origin_allowed("https://eu.reports.example.com"));
        assert!(!config.is_origin_allowed("https://evil.com"));
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        assert_eq!(env_parse("HELIO_TEST_UNSET_VARIABLE_FOR_PARSE", 42u32), 42);
    }
}
