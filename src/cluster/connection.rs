//! # Cluster Connection
//!
//! Builds the administrative connection the harness works through: resolved
//! credentials, a kube client, a type registry holding the platform's
//! built-in kinds, a cached REST mapper and the dynamic client bound to both.
//!
//! Building a connection never mutates the cluster.

use crate::cluster::backend::KubeBackend;
use crate::cluster::credentials::{resolve_credentials_and_namespace, Credentials};
use crate::cluster::discovery::DiscoveryClient;
use crate::cluster::dynamic::{DynamicClient, ResourceClient};
use crate::cluster::rest_mapper::RestMapper;
use crate::error::HarnessError;
use crate::scheme::registry::{add_builtin_kinds, add_extension_kinds, TypeRegistry};
use kube::Client;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct Connection {
    pub client: Client,
    pub credentials: Credentials,
    pub registry: TypeRegistry,
    pub discovery: Arc<dyn DiscoveryClient>,
    pub resources: Arc<dyn ResourceClient>,
    pub dynamic: DynamicClient,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("namespace", &self.credentials.namespace)
            .field("kubeconfig_path", &self.credentials.kubeconfig_path)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect with the kubeconfig at `kubeconfig`, or the default loading
    /// rules when `None`
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, HarnessError> {
        let credentials = resolve_credentials_and_namespace(kubeconfig).await?;
        let client = Client::try_from(credentials.config.clone()).map_err(|e| {
            HarnessError::Configuration(
                anyhow::Error::new(e).context("Failed to build the kube client"),
            )
        })?;
        let backend = Arc::new(KubeBackend::new(client.clone()));

        let connection = Self::assemble(
            credentials,
            client,
            Arc::clone(&backend) as Arc<dyn DiscoveryClient>,
            backend,
        )?;
        info!(
            namespace = %connection.credentials.namespace,
            kinds = connection.registry.len(),
            "Connected to cluster"
        );
        Ok(connection)
    }

    /// Assemble a connection over explicit discovery and resource backends
    pub fn assemble(
        credentials: Credentials,
        client: Client,
        discovery: Arc<dyn DiscoveryClient>,
        resources: Arc<dyn ResourceClient>,
    ) -> Result<Self, HarnessError> {
        let mut registry = TypeRegistry::new();
        add_builtin_kinds(&mut registry).map_err(|e| {
            HarnessError::Configuration(
                anyhow::Error::new(e).context("Failed to add built-in kinds to the type registry"),
            )
        })?;
        add_extension_kinds(&mut registry).map_err(|e| {
            HarnessError::Configuration(
                anyhow::Error::new(e).context("Failed to add API extension kinds to the type registry"),
            )
        })?;

        let mapper = Arc::new(RestMapper::new(Arc::clone(&discovery)));
        mapper.reset();
        let dynamic = DynamicClient::new(
            Arc::new(registry.clone()),
            mapper,
            Arc::clone(&resources),
        );

        Ok(Self {
            client,
            credentials,
            registry,
            discovery,
            resources,
            dynamic,
        })
    }
}
