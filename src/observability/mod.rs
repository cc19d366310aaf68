//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG / log_level)
//!     → /metrics (Prometheus scrape, not listed in /docs)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through spans via the trace layer
//! - Metric labels use matched route patterns, never raw paths

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
