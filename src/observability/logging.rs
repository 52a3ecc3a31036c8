//! # Logging
//!
//! Installs the global tracing subscriber. `RUST_LOG` always wins; otherwise
//! the configured `LOG_LEVEL` becomes the default directive for the harness crates.

use crate::config::HarnessConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value, falling back to text for anything unrecognised
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Default filter directive derived from a `LOG_LEVEL` value
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    let level = match log_level.to_ascii_uppercase().as_str() {
        "ERROR" => "error",
        "WARN" => "warn",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        _ => "info",
    };
    format!("operator_e2e_framework={level},e2e_suite={level}")
}

/// Install the global tracing subscriber
///
/// Returns an error if a subscriber has already been installed.
pub fn init_tracing(config: &HarnessConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match LogFormat::parse(&config.log_format) {
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?,
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?,
    }
    Ok(())
}
