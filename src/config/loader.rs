//! Configuration loading from disk and environment.

use std::env;
use std::fs;
use std::path::Path;

use crate::config::schema::ApiConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ApiConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ApiConfig::default(),
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment secrets and endpoints from the environment.
///
/// `lookup` is injected so tests do not touch process state.
pub fn apply_env_overrides<F>(config: &mut ApiConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CLICKHOUSE_URL") {
        config.clickhouse.url = v;
    }
    if let Some(v) = lookup("CLICKHOUSE_USER") {
        config.clickhouse.user = v;
    }
    if let Some(v) = lookup("CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = v;
    }
    if let Some(v) = lookup("CLICKHOUSE_DB") {
        config.clickhouse.database = v;
    }
    if let Some(v) = lookup("DEVLOCK_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("DEVLOCK_PUBLIC_URL") {
        config.login.public_url = v;
    }
    if let Some(v) = lookup("DEVLOCK_SESSION_SECRET") {
        config.login.session_secret = Some(v);
    }
}
