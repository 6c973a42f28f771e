//! Per-route, per-client rate limiting.
//!
//! Every rate-limited route family has its own budget of requests per
//! window. Budgets are tracked per client address, so one client exhausting
//! the download budget does not affect other clients or other routes.
//!
//! The client address comes from `X-Forwarded-For` (see
//! [`crate::extractors::actor`]), so the service must sit behind a proxy that
//! overwrites that header.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header::HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use helio_core::{AuditAction, AuditEvent, AuditOutcome};
use helio_storage::{record_best_effort, AuditSink};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::extractors::actor_from_parts;
use crate::telemetry::metrics::with_metrics;

/// Checks between two sweeps of idle client budgets.
const DEFAULT_PRUNE_EVERY: u64 = 1024;

/// Rate-limited route family.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RouteClass {
    Download,
    Cache,
    Privacy,
    Export,
}

impl RouteClass {
    /// Classify a request path. Paths outside the API (health, metrics) are
    /// not limited.
    pub fn for_path(path: &str) -> Option<Self> {
        if path.starts_with("/api/download/") {
            Some(RouteClass::Download)
        } else if path.starts_with("/api/cache/") {
            Some(RouteClass::Cache)
        } else if path.starts_with("/api/data/privacy/") {
            Some(RouteClass::Privacy)
        } else if path.starts_with("/api/data/export/") {
            Some(RouteClass::Export)
        } else {
            None
        }
    }

    pub const ALL: [RouteClass; 4] = [
        RouteClass::Download,
        RouteClass::Cache,
        RouteClass::Privacy,
        RouteClass::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Download => "download",
            RouteClass::Cache => "cache",
            RouteClass::Privacy => "privacy",
            RouteClass::Export => "export",
        }
    }
}

/// Sliding budgets keyed by (client, route family).
///
/// Each route family owns one keyed governor limiter. A client whose budget
/// has fully replenished is indistinguishable from a new one, so those keys
/// are dropped every `prune_every` checks.
pub struct RouteRateLimiter {
    enabled: bool,
    window: Duration,
    download: u32,
    cache: u32,
    privacy: u32,
    export: u32,
    limiters: HashMap<RouteClass, DefaultKeyedRateLimiter<String>>,
    prune_every: u64,
    checks: AtomicU64,
}

impl RouteRateLimiter {
    pub fn new(config: &ApiConfig) -> Self {
        let mut limiter = Self {
            enabled: config.rate_limit_enabled,
            window: config.rate_limit_window,
            download: config.rate_limit_download,
            cache: config.rate_limit_cache,
            privacy: config.rate_limit_privacy,
            export: config.rate_limit_export,
            limiters: HashMap::new(),
            prune_every: DEFAULT_PRUNE_EVERY,
            checks: AtomicU64::new(0),
        };
        for route in RouteClass::ALL {
            let quota = limiter.quota_for(route);
            limiter.limiters.insert(route, RateLimiter::keyed(quota));
        }
        limiter
    }

    /// Sweep idle budgets after every `checks` admitted or refused requests.
    pub fn with_prune_every(mut self, checks: u64) -> Self {
        self.prune_every = checks.max(1);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Requests allowed per window on a route family.
    pub fn limit_for(&self, route: RouteClass) -> u32 {
        match route {
            RouteClass::Download => self.download,
            RouteClass::Cache => self.cache,
            RouteClass::Privacy => self.privacy,
            RouteClass::Export => self.export,
        }
    }

    fn quota_for(&self, route: RouteClass) -> Quota {
        let limit = NonZeroU32::new(self.limit_for(route)).unwrap_or(NonZeroU32::MIN);
        // One cell replenishes every window/limit; a full window's worth may burst.
        Quota::with_period(self.window / limit.get())
            .unwrap_or_else(|| Quota::per_minute(limit))
            .allow_burst(limit)
    }

    /// Take one request from the client's budget on `route`.
    ///
    /// Returns the route's limit on success, or the seconds until the next
    /// request would be admitted.
    pub fn check(&self, client: &str, route: RouteClass) -> Result<u32, u64> {
        if !self.enabled {
            return Ok(self.limit_for(route));
        }
        let Some(limiter) = self.limiters.get(&route) else {
            return Ok(self.limit_for(route));
        };

        let outcome = limiter.check_key(&client.to_string());
        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1) % self.prune_every == 0 {
            self.prune();
        }

        match outcome {
            Ok(()) => Ok(self.limit_for(route)),
            Err(not_until) => {
                let retry_after = not_until
                    .wait_time_from(DefaultClock::default().now())
                    .as_secs()
                    .max(1);
                Err(retry_after)
            }
        }
    }

    /// Whether one more request from `client` on `route` is admitted.
    pub fn allow(&self, client: &str, route: RouteClass) -> bool {
        self.check(client, route).is_ok()
    }

    /// Drop budgets of clients that have been idle for a full window.
    pub fn prune(&self) {
        let before = self.tracked();
        for limiter in self.limiters.values() {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
        let after = self.tracked();
        if after < before {
            tracing::debug!(pruned = before - after, tracked = after, "Pruned idle rate limit budgets");
        }
    }

    /// Number of (client, route) budgets currently tracked.
    pub fn tracked(&self) -> usize {
        self.limiters.values().map(|limiter| limiter.len()).sum()
    }
}

/// State for [`rate_limit_middleware`].
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RouteRateLimiter>,
    pub audit: Arc<dyn AuditSink>,
}

impl RateLimitState {
    pub fn new(limiter: Arc<RouteRateLimiter>, audit: Arc<dyn AuditSink>) -> Self {
        Self { limiter, audit }
    }
}

/// Rate limiting middleware.
///
/// Refused requests get 429 with `Retry-After` and are audited as
/// `rate_limited`; admitted requests carry `x-ratelimit-limit`.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(route) = RouteClass::for_path(request.uri().path()) else {
        return next.run(request).await;
    };
    if !state.limiter.is_enabled() {
        return next.run(request).await;
    }

    let actor = actor_from_parts(request.headers(), request.extensions());

    match state.limiter.check(&actor.client_addr, route) {
        Ok(limit) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(limit),
            );
            response
        }
        Err(retry_after) => {
            tracing::warn!(
                client = %actor.client_addr,
                route = route.as_str(),
                retry_after_secs = retry_after,
                "Rate limit exceeded"
            );
            with_metrics(|m| m.record_rate_limited(route.as_str()));

            let event = AuditEvent::new(AuditAction::RateLimited, request.uri().path(), actor)
                .with_outcome(AuditOutcome::failure(
                    StatusCode::TOO_MANY_REQUESTS.as_u16(),
                    "rate_limited",
                ))
                .with_detail("route", route.as_str())
                .with_detail("method", request.method().as_str());
            record_best_effort(state.audit.as_ref(), &event).await;

            if request.method() == Method::HEAD {
                let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
                return response;
            }
            ApiError::too_many_requests(Some(retry_after)).into_response()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
