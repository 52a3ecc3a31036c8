//! # Errors
//!
//! Error taxonomy for the harness.
//!
//! Anything that prevents the cluster from reaching a consistent, listable
//! state is fatal and aborts before tests run. Teardown problems are never
//! represented here; they are logged as warnings.

use crate::constants::SETUP_FAILURE_EXIT_CODE;
use std::time::Duration;
use thiserror::Error;

/// Errors a registration function may return when adding kinds to a
/// [`TypeRegistry`](crate::scheme::TypeRegistry).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The same group/version/kind is already registered with a different plural
    #[error("kind {kind} is already registered as '{existing}', refusing to re-register as '{requested}'")]
    Conflict {
        kind: String,
        existing: String,
        requested: String,
    },
    /// The registration function produced an unusable kind
    #[error("invalid registration: {0}")]
    Invalid(String),
}

/// Failures of the dynamic client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("kind {0} is not registered in the type registry")]
    NotRegistered(String),
    #[error("no REST mapping for {kind}: {source:#}")]
    NoMapping {
        kind: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("request for {kind} failed: {source:#}")]
    Request {
        kind: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to decode {kind}: {message}")]
    Decode { kind: String, message: String },
}

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Bad credentials, unreadable manifest, unusable project root
    #[error("configuration error: {0:#}")]
    Configuration(anyhow::Error),

    /// The caller's registration function failed; passed through unchanged
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The API server never started serving the probe kind
    #[error("failed to build the dynamic client: {kind} was not listable after {attempts} attempts within {timeout:?}{}", .last_error.as_deref().map(|e| format!(": {e}")).unwrap_or_default())]
    ConvergenceTimeout {
        kind: String,
        attempts: u32,
        timeout: Duration,
        last_error: Option<String>,
    },

    /// Binary build or subprocess start failed
    #[error("local operator error: {0:#}")]
    Process(anyhow::Error),

    /// Applying a manifest to the cluster failed
    #[error("manifest error: {0:#}")]
    Manifest(anyhow::Error),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl HarnessError {
    /// Exit code synthesized when this error aborts the suite before tests run
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        SETUP_FAILURE_EXIT_CODE
    }

    pub(crate) fn configuration(message: impl std::fmt::Display) -> Self {
        HarnessError::Configuration(anyhow::anyhow!("{message}"))
    }
}
