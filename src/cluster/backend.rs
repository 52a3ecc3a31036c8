//! # Kubernetes Backend
//!
//! Discovery and resource operations served by a live API server through
//! `kube::Client`.

use crate::cluster::discovery::{DiscoveredResource, DiscoveryClient, ResourceScope};
use crate::cluster::dynamic::{CreateOutcome, ResourceClient};
use crate::cluster::rest_mapper::RestMapping;
use crate::constants::FIELD_MANAGER;
use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::core::GroupVersion;
use kube::Client;
use tracing::debug;

#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
}

impl std::fmt::Debug for KubeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeBackend").finish_non_exhaustive()
    }
}

impl KubeBackend {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, mapping: &RestMapping, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &mapping.resource),
            None => Api::all_with(self.client.clone(), &mapping.resource),
        }
    }
}

#[async_trait]
impl DiscoveryClient for KubeBackend {
    async fn server_resources_for_group_version(
        &self,
        group: &str,
        version: &str,
    ) -> Result<Vec<DiscoveredResource>> {
        let gv = GroupVersion::gv(group, version);
        let api_group = kube::discovery::pinned_group(&self.client, &gv)
            .await
            .with_context(|| format!("Failed to discover resources for {}", gv.api_version()))?;

        Ok(api_group
            .versioned_resources(version)
            .into_iter()
            .map(|(resource, caps)| DiscoveredResource {
                resource,
                scope: ResourceScope::from(&caps.scope),
            })
            .collect())
    }
}

#[async_trait]
impl ResourceClient for KubeBackend {
    async fn list(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let list = self
            .api(mapping, namespace)
            .list(&ListParams::default())
            .await
            .with_context(|| format!("Failed to list {}", mapping.resource.plural))?;
        Ok(list.items)
    }

    async fn apply(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject> {
        let name = object
            .metadata
            .name
            .as_deref()
            .context("Object has no metadata.name")?;
        debug!(
            kind = %mapping.resource.kind,
            name = %name,
            namespace = namespace.unwrap_or(""),
            "Applying object"
        );
        let params = PatchParams::apply(FIELD_MANAGER).force();
        self.api(mapping, namespace)
            .patch(name, &params, &Patch::Apply(object))
            .await
            .with_context(|| format!("Failed to apply {} {name}", mapping.resource.kind))
    }

    async fn create(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<CreateOutcome> {
        let name = object.metadata.name.as_deref().unwrap_or("");
        match self
            .api(mapping, namespace)
            .create(&PostParams::default(), object)
            .await
        {
            Ok(created) => Ok(CreateOutcome::Created(created)),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                debug!(
                    kind = %mapping.resource.kind,
                    name = %name,
                    "Object already exists"
                );
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to create {} {name}", mapping.resource.kind))),
        }
    }

    async fn delete(&self, mapping: &RestMapping, namespace: Option<&str>, name: &str) -> Result<()> {
        self.api(mapping, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("Failed to delete {} {name}", mapping.resource.kind))?;
        Ok(())
    }
}
