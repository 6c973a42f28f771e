//! Middleware for the HELIO API.
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/download/:id", get(handler))
//!     // Rate limiting runs after routing so 404s are not counted
//!     .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//!     .layer(middleware::from_fn(observability_middleware))
//!     .layer(cors)
//!     // Outermost
//! ```

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimitState, RouteClass, RouteRateLimiter};
