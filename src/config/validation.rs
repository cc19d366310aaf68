//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values before the config is
//! accepted. Every problem is reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ApiConfig;
use crate::login::session::decode_session_key;
use crate::security::rate_limit::RatePolicy;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check an [`ApiConfig`] for semantic errors.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    for (route, policy) in &config.rate_limit.routes {
        if !route.starts_with('/') {
            errors.push(ValidationError::new(
                format!("rate_limit.routes.{route}"),
                "route pattern must start with '/'",
            ));
        }
        if let Err(e) = policy.parse::<RatePolicy>() {
            errors.push(ValidationError::new(
                format!("rate_limit.routes.{route}"),
                e.to_string(),
            ));
        }
    }

    if config.compression.level > 9 {
        errors.push(ValidationError::new(
            "compression.level",
            "gzip level must be between 0 and 9",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    if config.login.enabled {
        if Url::parse(&config.login.public_url).is_err() {
            errors.push(ValidationError::new("login.public_url", "not a valid URL"));
        }
        if Url::parse(&config.login.provider_url).is_err() {
            errors.push(ValidationError::new("login.provider_url", "not a valid URL"));
        }
        match config.login.session_secret.as_deref() {
            None => errors.push(ValidationError::new(
                "login.session_secret",
                "required when login is enabled (set DEVLOCK_SESSION_SECRET)",
            )),
            Some(secret) => {
                if let Err(e) = decode_session_key(secret) {
                    errors.push(ValidationError::new("login.session_secret", e.to_string()));
                }
            }
        }
    }

    if config.observability.metrics_enabled && !config.observability.metrics_path.starts_with('/')
    {
        errors.push(ValidationError::new(
            "observability.metrics_path",
            "must start with '/'",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
