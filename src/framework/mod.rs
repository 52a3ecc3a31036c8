//! # Framework
//!
//! The harness state shared by the suite orchestrator and by test code.
//!
//! The framework owns the authoritative type registry behind an async mutex
//! and the active dynamic client behind a read/write lock. Test code reaches
//! the cluster through [`Framework::client`] and registers its own kinds with
//! [`Framework::extend_scheme`]:
//!
//! 1. The registry is locked. All extensions are serialized.
//! 2. The registration function runs against a staged copy; its error is
//!    returned unchanged.
//! 3. A fresh REST mapper is built and reset, and a candidate client is
//!    bound to the staged registry and that mapper.
//! 4. The candidate probes the representative kind until it is listable.
//! 5. The staged registry is committed and the candidate becomes the active
//!    client, all before the lock is released.
//!
//! Readers outside the lock therefore only ever see a fully converged client.

pub mod cleanup;
pub mod manifest;
pub mod namespaces;
pub mod runner;
pub mod suite;

pub use cleanup::CleanupScope;
pub use manifest::{parse_manifest_documents, read_manifest, DynamicManifestApplier, ManifestApplier};
pub use namespaces::NamespaceContext;
pub use runner::CommandRunner;
pub use suite::{Suite, SuiteReport, SuiteStage, TestRunner};

use crate::cluster::connection::Connection;
use crate::cluster::credentials::Credentials;
use crate::cluster::discovery::DiscoveryClient;
use crate::cluster::dynamic::{DynamicClient, ResourceClient};
use crate::cluster::rest_mapper::RestMapper;
use crate::config::{FrameworkOptions, HarnessConfig, TestType};
use crate::error::{HarnessError, RegistrationError};
use crate::scheme::probe::{wait_until_listable, ProbeConfig};
use crate::scheme::registry::{gvk_of, kind_display, TypeRegistry};
use kube::core::GroupVersionKind;
use kube::{Client, Resource};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

pub struct Framework {
    kube_client: Client,
    credentials: Credentials,
    namespaces: NamespaceContext,
    options: FrameworkOptions,
    probe: ProbeConfig,
    output_flush_timeout: Duration,
    scheme: Mutex<TypeRegistry>,
    active: RwLock<DynamicClient>,
    discovery: Arc<dyn DiscoveryClient>,
    resources: Arc<dyn ResourceClient>,
}

impl std::fmt::Debug for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framework")
            .field("namespaces", &self.namespaces)
            .field("options", &self.options)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

impl Framework {
    /// Build a framework, resolving namespaces from the environment
    #[must_use]
    pub fn new(connection: Connection, options: FrameworkOptions, config: &HarnessConfig) -> Self {
        let namespaces = NamespaceContext::from_env(&connection.credentials.namespace);
        Self::with_namespaces(connection, options, config, namespaces)
    }

    #[must_use]
    pub fn with_namespaces(
        connection: Connection,
        options: FrameworkOptions,
        config: &HarnessConfig,
        namespaces: NamespaceContext,
    ) -> Self {
        let Connection {
            client,
            credentials,
            registry,
            discovery,
            resources,
            dynamic,
        } = connection;

        info!(
            operator_namespace = %namespaces.operator,
            watch_namespace = %namespaces.watch,
            test_type = %options.test_type,
            local_operator = options.local_operator,
            "Framework initialized"
        );

        Self {
            kube_client: client,
            credentials,
            namespaces,
            options,
            probe: ProbeConfig::from(config),
            output_flush_timeout: config.output_flush_timeout(),
            scheme: Mutex::new(registry),
            active: RwLock::new(dynamic),
            discovery,
            resources,
        }
    }

    /// Register additional kinds and wait until `probe_kind` is listable
    ///
    /// On success the active client recognizes every kind registered so far.
    /// On failure the registry and the active client are left untouched.
    pub async fn extend_scheme<F>(
        &self,
        register: F,
        probe_kind: &GroupVersionKind,
    ) -> Result<(), HarnessError>
    where
        F: FnOnce(&mut TypeRegistry) -> Result<(), RegistrationError>,
    {
        let mut scheme = self.scheme.lock().await;

        let mut staged = scheme.clone();
        register(&mut staged)?;
        let staged = Arc::new(staged);

        let mapper = Arc::new(RestMapper::new(Arc::clone(&self.discovery)));
        mapper.reset();
        let candidate = DynamicClient::new(
            Arc::clone(&staged),
            mapper,
            Arc::clone(&self.resources),
        );

        let attempts =
            wait_until_listable(&candidate, probe_kind, &self.namespaces.probe, &self.probe).await?;

        *scheme = staged.as_ref().clone();
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = candidate;
        info!(
            kind = %kind_display(probe_kind),
            attempts,
            kinds = scheme.len(),
            "Extended scheme"
        );
        Ok(())
    }

    /// [`Framework::extend_scheme`] probing with the list of `K`
    pub async fn extend_scheme_for<K, F>(&self, register: F) -> Result<(), HarnessError>
    where
        K: Resource<DynamicType = ()>,
        F: FnOnce(&mut TypeRegistry) -> Result<(), RegistrationError>,
    {
        self.extend_scheme(register, &gvk_of::<K>()).await
    }

    /// The active dynamic client
    #[must_use]
    pub fn client(&self) -> DynamicClient {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Kube client for typed access to built-in kinds
    #[must_use]
    pub fn kube_client(&self) -> Client {
        self.kube_client.clone()
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Kubeconfig handed to child processes
    #[must_use]
    pub fn kubeconfig_path(&self) -> Option<&Path> {
        self.options
            .explicit_kubeconfig()
            .or(self.credentials.kubeconfig_path.as_deref())
    }

    #[must_use]
    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    #[must_use]
    pub fn operator_namespace(&self) -> &str {
        &self.namespaces.operator
    }

    #[must_use]
    pub fn watch_namespace(&self) -> &str {
        &self.namespaces.watch
    }

    #[must_use]
    pub fn options(&self) -> &FrameworkOptions {
        &self.options
    }

    #[must_use]
    pub fn probe_config(&self) -> &ProbeConfig {
        &self.probe
    }

    #[must_use]
    pub fn output_flush_timeout(&self) -> Duration {
        self.output_flush_timeout
    }

    #[must_use]
    pub fn is_local_operator(&self) -> bool {
        self.options.local_operator
    }

    #[must_use]
    pub fn test_type(&self) -> TestType {
        self.options.test_type
    }

    /// Whether tests that must not share the cluster should run
    #[must_use]
    pub fn runs_serial(&self) -> bool {
        matches!(self.options.test_type, TestType::All | TestType::Serial)
    }

    /// Whether tests that tolerate concurrency should run
    #[must_use]
    pub fn runs_parallel(&self) -> bool {
        matches!(self.options.test_type, TestType::All | TestType::Parallel)
    }

    /// Snapshot of the authoritative registry
    pub async fn registry(&self) -> TypeRegistry {
        self.scheme.lock().await.clone()
    }
}
