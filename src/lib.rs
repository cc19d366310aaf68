//! Read-only HTTP API over match, salt and active-match data, plus an
//! experimental Steam sign-in flow.

pub mod api;
pub mod config;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod login;
pub mod observability;
pub mod security;

pub use config::ApiConfig;
pub use db::{ClickHouseExecutor, QueryExecutor};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
