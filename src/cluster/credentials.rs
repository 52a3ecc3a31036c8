//! # Credentials
//!
//! Kubeconfig resolution and the namespace the credentials default to.

use crate::constants::{DEFAULT_NAMESPACE, KUBECONFIG_ENV, RECOMMENDED_HOME_KUBECONFIG};
use crate::error::HarnessError;
use anyhow::Context;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Config;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Administrative credentials and their default namespace
#[derive(Debug, Clone)]
pub struct Credentials {
    pub config: Config,
    /// The kubeconfig file the credentials came from, or the file the default
    /// loading rules would try first
    pub kubeconfig_path: Option<PathBuf>,
    pub namespace: String,
}

/// Resolve credentials from `path`, or from the default loading rules when
/// no path is given
pub async fn resolve_credentials_and_namespace(
    path: Option<&Path>,
) -> Result<Credentials, HarnessError> {
    let (config, kubeconfig_path) = match path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))
                .map_err(HarnessError::Configuration)?;
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .with_context(|| format!("Failed to build the kubeconfig from {}", path.display()))
                .map_err(HarnessError::Configuration)?;
            (config, Some(path.to_path_buf()))
        }
        None => {
            let config = Config::infer()
                .await
                .context("Failed to build the kubeconfig from the default loading rules")
                .map_err(HarnessError::Configuration)?;
            (config, default_kubeconfig_path())
        }
    };

    let namespace = if config.default_namespace.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        config.default_namespace.clone()
    };
    debug!(namespace = %namespace, kubeconfig = ?kubeconfig_path, "Resolved credentials");

    Ok(Credentials {
        config,
        kubeconfig_path,
        namespace,
    })
}

/// Kubeconfig files in the order the default loading rules consult them
///
/// `KUBECONFIG` (a path list) wins when set; otherwise the file under the
/// home directory.
#[must_use]
pub fn kubeconfig_precedence(kubeconfig_env: Option<OsString>, home: Option<PathBuf>) -> Vec<PathBuf> {
    if let Some(value) = kubeconfig_env.filter(|v| !v.is_empty()) {
        return std::env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
    }
    home.map(|h| h.join(RECOMMENDED_HOME_KUBECONFIG))
        .into_iter()
        .collect()
}

/// Highest-priority kubeconfig path of the default loading rules
#[must_use]
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    kubeconfig_precedence(std::env::var_os(KUBECONFIG_ENV), dirs::home_dir())
        .into_iter()
        .next()
}
