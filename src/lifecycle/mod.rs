//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build executor/server → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → broadcast → stop accepting → drain → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
