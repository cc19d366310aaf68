//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request on a /v1 route:
//!     → rate_limit.rs (derive client key, look up route policy)
//!     → fixed window check (DashMap entry lock)
//!     → 429 with Retry-After, or pass to the handler
//! ```
//!
//! # Design Decisions
//! - Policies are data (route pattern → "N/period"), not per-handler annotations
//! - Counters live in process memory only; a restart resets them
//! - Client key is the peer address unless configured to trust X-Forwarded-For

pub mod rate_limit;

pub use rate_limit::{
    client_key, rate_limit_middleware, Decision, FixedWindowLimiter, PolicyError, RateLimiterState,
    RatePolicy,
};
