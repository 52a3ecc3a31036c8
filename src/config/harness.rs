//! # Harness Configuration
//!
//! Harness-level tunables loaded from environment variables.

use std::time::Duration;

/// Harness-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Interval between convergence probe attempts (milliseconds)
    pub probe_interval_ms: u64,
    /// Total budget for one convergence probe (seconds)
    pub probe_timeout_secs: u64,
    /// How long shutdown waits for captured operator output to drain (seconds)
    pub output_flush_timeout_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            output_flush_timeout_secs: DEFAULT_OUTPUT_FLUSH_TIMEOUT_SECS,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            probe_interval_ms: env_var_or_default("E2E_PROBE_INTERVAL_MS", DEFAULT_PROBE_INTERVAL_MS),
            probe_timeout_secs: env_var_or_default(
                "E2E_PROBE_TIMEOUT_SECS",
                DEFAULT_PROBE_TIMEOUT_SECS,
            ),
            output_flush_timeout_secs: env_var_or_default(
                "E2E_OUTPUT_FLUSH_TIMEOUT_SECS",
                DEFAULT_OUTPUT_FLUSH_TIMEOUT_SECS,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
        }
    }

    /// Get probe interval duration
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Get probe budget duration
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Get output flush timeout duration
    #[must_use]
    pub fn output_flush_timeout(&self) -> Duration {
        Duration::from_secs(self.output_flush_timeout_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating an empty value as unset
#[must_use]
pub fn env_var_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
