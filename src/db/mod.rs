//! Data access subsystem.
//!
//! # Data Flow
//! ```text
//! route handler
//!     → query.rs (NamedQuery: SQL template + named parameter values)
//!     → QueryExecutor (trait object held in AppState)
//!     → clickhouse.rs (server-side parameters, JSONEachRow body)
//!     → Vec<NamedRow> / Option<NamedRow>
//! ```
//!
//! # Design Decisions
//! - Rows stay untyped JSON objects; the API passes them through unmodified
//! - Errors propagate to the handler unchanged and become 500 responses

pub mod clickhouse;
pub mod query;

pub use self::clickhouse::ClickHouseExecutor;
pub use query::{NamedQuery, NamedRow, ParamValue, QueryError, QueryExecutor};
