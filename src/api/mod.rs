//! Versioned read-only data API.
//!
//! # Data Flow
//! ```text
//! GET /v1/...
//!     → rate_limit_middleware (policy of the matched route)
//!     → handlers.rs (parse skip / match_id / created_after)
//!     → QueryExecutor::fetch_all / fetch_first
//!     → Json rows
//! ```

pub mod handlers;
pub mod params;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::http::server::AppState;
use crate::security::{rate_limit_middleware, RateLimiterState};
use self::handlers::*;

pub const MATCHES_PATH: &str = "/v1/matches";
pub const MATCH_META_PATH: &str = "/v1/matches/{match_id}/meta";
pub const SALTS_PATH: &str = "/v1/salts";
pub const ACTIVE_MATCHES_PATH: &str = "/v1/active-matches";

/// Data routes with admission control applied to each matched route.
pub fn router(limiter: Arc<RateLimiterState>) -> Router<AppState> {
    Router::new()
        .route(MATCHES_PATH, get(list_matches))
        .route(MATCH_META_PATH, get(match_meta))
        .route(SALTS_PATH, get(list_salts))
        .route(ACTIVE_MATCHES_PATH, get(list_active_matches))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
}
