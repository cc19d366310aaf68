//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides for secrets/endpoints)
//!     → validation.rs (semantic checks)
//!     → ApiConfig (validated, immutable)
//!     → consumed once by HttpServer::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secrets come from the environment and never have a usable default

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, ClickHouseConfig, ClientKeySource, CompressionConfig, ListenerConfig,
    LoginConfig, ObservabilityConfig, RateLimitConfig, TimeoutConfig,
};
