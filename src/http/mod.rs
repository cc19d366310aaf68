//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address kept via ConnectInfo)
//!     → request.rs (set/propagate x-request-id)
//!     → trace span, gzip, timeout, metrics (server.rs layers)
//!     → route: shell (/, /docs, /health, /metrics) | api (/v1 data) | login
//!     → error.rs (ApiError → status + body)
//! ```

pub mod error;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
