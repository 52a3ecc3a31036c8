//! # Discovery-Convergence Probe
//!
//! After kinds are registered client-side, the API server may still be
//! establishing them (a CRD that was just created is not served yet). The
//! probe lists a representative kind until it succeeds or the budget runs out.
//!
//! The first attempt happens immediately. Every failed attempt resets the
//! client's REST mapper before the next one, because discovery data observed
//! during the establishment window may be partial or wrong.
//!
//! Default policy: one attempt per second for at most ten seconds.

use crate::cluster::dynamic::DynamicClient;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::scheme::registry::kind_display;
use kube::core::GroupVersionKind;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Poll interval and total budget of a convergence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::from(&HarnessConfig::default())
    }
}

impl From<&HarnessConfig> for ProbeConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            interval: config.probe_interval(),
            timeout: config.probe_timeout(),
        }
    }
}

/// Where a probe currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeState {
    /// Another attempt is due
    Probing { attempt: u32 },
    /// The probe kind was listed successfully on attempt `attempts`
    Converged { attempts: u32 },
    /// The deadline passed without a successful list
    TimedOut {
        attempts: u32,
        last_error: Option<String>,
    },
}

/// Probe until `probe_kind` is listable through `client`
///
/// Returns the number of attempts it took to converge, or
/// [`HarnessError::ConvergenceTimeout`] once `config.timeout` has elapsed.
pub async fn wait_until_listable(
    client: &DynamicClient,
    probe_kind: &GroupVersionKind,
    namespace: &str,
    config: &ProbeConfig,
) -> Result<u32, HarnessError> {
    let deadline = Instant::now() + config.timeout;
    let mut state = ProbeState::Probing { attempt: 1 };

    loop {
        state = match state {
            ProbeState::Probing { attempt } => {
                match client.list(probe_kind, Some(namespace)).await {
                    Ok(_) => ProbeState::Converged { attempts: attempt },
                    Err(e) => {
                        debug!(
                            kind = %kind_display(probe_kind),
                            attempt,
                            error = %e,
                            "Probe kind not listable yet, resetting REST mapper"
                        );
                        client.rest_mapper().reset();

                        let now = Instant::now();
                        if now >= deadline {
                            ProbeState::TimedOut {
                                attempts: attempt,
                                last_error: Some(e.to_string()),
                            }
                        } else {
                            tokio::time::sleep(config.interval.min(deadline - now)).await;
                            ProbeState::Probing {
                                attempt: attempt + 1,
                            }
                        }
                    }
                }
            }
            ProbeState::Converged { attempts } => {
                debug!(kind = %kind_display(probe_kind), attempts, "Probe kind is listable");
                return Ok(attempts);
            }
            ProbeState::TimedOut {
                attempts,
                last_error,
            } => {
                return Err(HarnessError::ConvergenceTimeout {
                    kind: kind_display(probe_kind),
                    attempts,
                    timeout: config.timeout,
                    last_error,
                });
            }
        };
    }
}
