//! # Operator E2E Framework
//!
//! Harness for end-to-end tests of Kubernetes operators.
//!
//! It connects to a cluster, lets test code register custom resource kinds
//! with [`Framework::extend_scheme`](framework::Framework::extend_scheme)
//! (waiting until the API server actually serves them), installs baseline
//! manifests, optionally builds and runs the operator locally, runs the tests
//! and tears everything down again.
//!
//! ## Modules
//!
//! - [`cluster`]: credentials, discovery, REST mapping, dynamic client
//! - [`scheme`]: type registry and discovery-convergence probe
//! - [`operator`]: local operator build, launch and shutdown
//! - [`framework`]: shared harness state, cleanup, manifests, suite orchestration
//! - [`config`]: command-line options and environment tunables

pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod framework;
pub mod observability;
pub mod operator;
pub mod scheme;
pub mod tls;

pub use error::{ClientError, HarnessError, RegistrationError};
pub use framework::Framework;
