//! # Configuration
//!
//! Command-line options and environment-driven tunables for the harness.

mod harness;
mod options;

pub use harness::{env_var_non_empty, HarnessConfig};
pub use options::{FrameworkOptions, TestType};
