//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the API service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// ClickHouse connection settings.
    pub clickhouse: ClickHouseConfig,

    /// Per-route admission policies.
    pub rate_limit: RateLimitConfig,

    /// Response compression.
    pub compression: CompressionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Third-party identity login.
    pub login: LoginConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// ClickHouse connection settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    /// HTTP interface URL.
    pub url: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8123".to_string(),
            user: "default".to_string(),
            password: String::new(),
            database: "default".to_string(),
        }
    }
}

impl std::fmt::Debug for ClickHouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// How the rate limiter identifies a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientKeySource {
    /// Source address of the TCP connection.
    #[default]
    Peer,
    /// First entry of `X-Forwarded-For`, falling back to the peer address.
    ForwardedFor,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Client identification strategy.
    pub key_source: ClientKeySource,

    /// Matched route pattern -> policy text (e.g. "100/minute").
    pub routes: BTreeMap<String, String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let routes = [
            "/v1/matches",
            "/v1/matches/{match_id}/meta",
            "/v1/salts",
            "/v1/active-matches",
        ]
        .into_iter()
        .map(|route| (route.to_string(), "100/minute".to_string()))
        .collect();

        Self {
            enabled: true,
            key_source: ClientKeySource::Peer,
            routes,
        }
    }
}

/// Gzip compression of responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,

    /// Bodies smaller than this many bytes are sent uncompressed.
    pub min_size: u16,

    /// Gzip level, 0-9.
    pub level: u8,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_size: 1000,
            level: 5,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Login flow configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Mount the `/v1/login` routes.
    pub enabled: bool,

    /// Externally visible base URL; used as OpenID realm and to build the callback URL.
    pub public_url: String,

    /// OpenID endpoint of the identity provider.
    pub provider_url: String,

    /// Name of the encrypted session cookie.
    pub cookie_name: String,

    /// Set the `Secure` attribute on the session cookie.
    pub secure_cookie: bool,

    /// Base64 encoded key material (at least 64 bytes once decoded).
    #[serde(skip_serializing)]
    pub session_secret: Option<String>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_url: "http://localhost:8080".to_string(),
            provider_url: "https://steamcommunity.com/openid/login".to_string(),
            cookie_name: "devlock_session".to_string(),
            secure_cookie: false,
            session_secret: None,
        }
    }
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("enabled", &self.enabled)
            .field("public_url", &self.public_url)
            .field("provider_url", &self.provider_url)
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookie", &self.secure_cookie)
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Path the Prometheus exposition is served on.
    pub metrics_path: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_path: "/metrics".to_string(),
        }
    }
}
