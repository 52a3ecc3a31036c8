//! # Observability
//!
//! Tracing setup for the harness.
//!
//! - `logging`: tracing subscriber installation (text or JSON output)

pub mod logging;

pub use logging::*;
