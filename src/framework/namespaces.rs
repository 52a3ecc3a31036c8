//! # Namespace Context
//!
//! Namespaces the suite works in, fixed once the framework is built.

use crate::config::env_var_non_empty;
use crate::constants::{
    DEFAULT_PROBE_NAMESPACE, TEST_OPERATOR_NAMESPACE_ENV, TEST_WATCH_NAMESPACE_ENV,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Namespace the operator under test is installed in
    pub operator: String,
    /// Namespace a local operator is told to watch; empty means cluster-wide
    pub watch: String,
    /// Namespace convergence probes list in
    pub probe: String,
}

impl NamespaceContext {
    /// Resolve from the credentials' namespace and the environment overrides
    ///
    /// - operator: a non-empty `operator_override`, else `credential_namespace`
    /// - watch: `watch_override` whenever it is present (even empty), else the
    ///   operator namespace
    /// - probe: the operator namespace when it was overridden, else `default`
    #[must_use]
    pub fn resolve(
        credential_namespace: &str,
        operator_override: Option<&str>,
        watch_override: Option<&str>,
    ) -> Self {
        let operator_override = operator_override.filter(|ns| !ns.is_empty());
        let operator = operator_override.unwrap_or(credential_namespace).to_string();
        let watch = watch_override.map_or_else(|| operator.clone(), str::to_string);
        let probe = match operator_override {
            Some(_) => operator.clone(),
            None => DEFAULT_PROBE_NAMESPACE.to_string(),
        };
        Self {
            operator,
            watch,
            probe,
        }
    }

    /// Resolve using `TEST_OPERATOR_NAMESPACE` and `TEST_WATCH_NAMESPACE`
    #[must_use]
    pub fn from_env(credential_namespace: &str) -> Self {
        let operator_override = env_var_non_empty(TEST_OPERATOR_NAMESPACE_ENV);
        let watch_override = std::env::var(TEST_WATCH_NAMESPACE_ENV).ok();
        Self::resolve(
            credential_namespace,
            operator_override.as_deref(),
            watch_override.as_deref(),
        )
    }
}
