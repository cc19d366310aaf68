//! Rate limiting middleware with per-route fixed windows.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::{ClientKeySource, RateLimitConfig};
use crate::observability::metrics;

/// Header consulted when keys come from a fronting proxy.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Longest window a policy may use.
pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Error produced when a policy string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid rate limit policy '{policy}': {reason}")]
pub struct PolicyError {
    policy: String,
    reason: &'static str,
}

/// Maximum number of requests accepted within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RatePolicy {
    /// Windows longer than [`MAX_WINDOW`] are clamped to it.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window: window.min(MAX_WINDOW),
        }
    }
}

impl fmt::Display for RatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {} seconds", self.max_requests, self.window.as_secs())
    }
}

/// Parses `"<n>/<unit>"` or `"<n>/<k> <unit>"`, e.g. `"100/minute"`, `"10/30 seconds"`.
impl FromStr for RatePolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| PolicyError {
            policy: s.to_string(),
            reason,
        };

        let (count, period) = s.split_once('/').ok_or_else(|| err("expected '<count>/<period>'"))?;
        let max_requests: u32 = count
            .trim()
            .parse()
            .map_err(|_| err("request count is not a number"))?;
        if max_requests == 0 {
            return Err(err("request count must be positive"));
        }

        let mut parts = period.split_whitespace();
        let (multiplier, unit) = match (parts.next(), parts.next(), parts.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(k), Some(unit), None) => (
                k.parse::<u64>().map_err(|_| err("period multiplier is not a number"))?,
                unit,
            ),
            _ => return Err(err("expected '<count>/<period>'")),
        };
        if multiplier == 0 {
            return Err(err("period must be positive"));
        }

        let unit_secs = match unit.to_ascii_lowercase().trim_end_matches('s') {
            "second" => 1,
            "minute" => 60,
            "hour" => 60 * 60,
            "day" => 24 * 60 * 60,
            _ => return Err(err("unknown period unit")),
        };

        let window = multiplier
            .checked_mul(unit_secs)
            .map(Duration::from_secs)
            .filter(|w| *w <= MAX_WINDOW)
            .ok_or_else(|| err("period must not exceed 365 days"))?;

        Ok(Self::new(max_requests, window))
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Counter for one (route, client) pair.
#[derive(Debug)]
struct Window {
    expires_at: Instant,
    count: u32,
}

/// Fixed-window counters anchored at the first request of each window.
///
/// Counts are updated while holding the entry's shard lock, so concurrent
/// requests for the same key never undercount.
#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    windows: DashMap<(String, String), Window>,
}

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, route: &str, client: &str, policy: &RatePolicy) -> Decision {
        self.check_at(route, client, policy, Instant::now())
    }

    pub fn check_at(
        &self,
        route: &str,
        client: &str,
        policy: &RatePolicy,
        now: Instant,
    ) -> Decision {
        let mut window = self
            .windows
            .entry((route.to_string(), client.to_string()))
            .or_insert_with(|| Window {
                expires_at: window_end(now, policy),
                count: 0,
            });

        if now >= window.expires_at {
            window.expires_at = window_end(now, policy);
            window.count = 0;
        }

        if window.count < policy.max_requests {
            window.count += 1;
            Decision::Allowed {
                remaining: policy.max_requests - window.count,
            }
        } else {
            Decision::Limited {
                retry_after: window.expires_at.saturating_duration_since(now),
            }
        }
    }

    /// Drop windows that ended before `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.expires_at > now);
        before - self.windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

// Instants near the platform limit cannot take a full window; such a window
// ends immediately instead of overflowing.
fn window_end(now: Instant, policy: &RatePolicy) -> Instant {
    now.checked_add(policy.window.min(MAX_WINDOW)).unwrap_or(now)
}

/// Process-scoped limiter state: the route → policy table plus counters.
#[derive(Debug)]
pub struct RateLimiterState {
    limiter: FixedWindowLimiter,
    policies: HashMap<String, RatePolicy>,
    key_source: ClientKeySource,
    enabled: bool,
}

impl RateLimiterState {
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, PolicyError> {
        let policies = config
            .routes
            .iter()
            .map(|(route, policy)| Ok((route.clone(), policy.parse()?)))
            .collect::<Result<HashMap<_, _>, PolicyError>>()?;

        Ok(Self {
            limiter: FixedWindowLimiter::new(),
            policies,
            key_source: config.key_source,
            enabled: config.enabled,
        })
    }

    pub fn policy(&self, route: &str) -> Option<&RatePolicy> {
        self.policies.get(route)
    }

    /// `None` when the route carries no policy or limiting is off.
    pub fn check(&self, route: &str, client: &str) -> Option<Decision> {
        if !self.enabled {
            return None;
        }
        let policy = self.policies.get(route)?;
        Some(self.limiter.check(route, client, policy))
    }

    pub fn limiter(&self) -> &FixedWindowLimiter {
        &self.limiter
    }

    /// Longest configured window; used as the sweep interval.
    pub fn longest_window(&self) -> Duration {
        self.policies
            .values()
            .map(|p| p.window)
            .max()
            .unwrap_or(Duration::from_secs(60))
    }
}

/// Derive the rate-limit key for a request.
pub fn client_key<B>(request: &Request<B>, source: ClientKeySource) -> String {
    if source == ClientKeySource::ForwardedFor {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware enforcing the policy of the matched route.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(route) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
    else {
        return next.run(request).await;
    };

    let key = client_key(&request, state.key_source);

    match state.check(&route, &key) {
        Some(Decision::Limited { retry_after }) => {
            tracing::warn!(client = %key, route = %route, "Rate limit exceeded");
            metrics::record_rate_limited(&route);

            let policy = state
                .policy(&route)
                .map(ToString::to_string)
                .unwrap_or_default();
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Rate limit exceeded: {policy}"),
            )
                .into_response();
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            response
        }
        _ => next.run(request).await,
    }
}
