//! # Dynamic Client
//!
//! Operates on any kind in a type-registry snapshot without kind-specific
//! generated code. A client is bound to exactly one registry snapshot and one
//! REST mapper; registering new kinds means building a new client.

use crate::cluster::rest_mapper::{RestMapper, RestMapping};
use crate::error::ClientError;
use crate::scheme::registry::{gvk_of, kind_display, TypeRegistry};
use anyhow::Result;
use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use kube::Resource;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Raw resource operations against a resolved API location
///
/// `namespace` is `None` for cluster-scoped kinds and for listing a
/// namespaced kind across all namespaces.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn list(&self, mapping: &RestMapping, namespace: Option<&str>)
        -> Result<Vec<DynamicObject>>;

    /// Create or update `object` with server-side apply
    async fn apply(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<DynamicObject>;

    /// Create `object` unless an object of that name already exists
    async fn create(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<CreateOutcome>;

    async fn delete(&self, mapping: &RestMapping, namespace: Option<&str>, name: &str)
        -> Result<()>;
}

/// Result of [`ResourceClient::create`]
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(DynamicObject),
    /// The object was left as the server had it
    AlreadyExists,
}

#[derive(Clone)]
pub struct DynamicClient {
    registry: Arc<TypeRegistry>,
    mapper: Arc<RestMapper>,
    resources: Arc<dyn ResourceClient>,
}

impl std::fmt::Debug for DynamicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicClient")
            .field("registry", &self.registry)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

impl DynamicClient {
    #[must_use]
    pub fn new(
        registry: Arc<TypeRegistry>,
        mapper: Arc<RestMapper>,
        resources: Arc<dyn ResourceClient>,
    ) -> Self {
        Self {
            registry,
            mapper,
            resources,
        }
    }

    /// The registry snapshot this client was built against
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn rest_mapper(&self) -> &Arc<RestMapper> {
        &self.mapper
    }

    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<RestMapping, ClientError> {
        if !self.registry.recognizes(gvk) {
            return Err(ClientError::NotRegistered(kind_display(gvk)));
        }
        self.mapper
            .mapping(gvk)
            .await
            .map_err(|source| ClientError::NoMapping {
                kind: kind_display(gvk),
                source,
            })
    }

    /// List objects of `gvk`
    ///
    /// Namespaced kinds are listed in `namespace` (all namespaces when `None`);
    /// cluster-scoped kinds ignore `namespace`.
    pub async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>, ClientError> {
        let mapping = self.resolve(gvk).await?;
        let namespace = namespace.filter(|_| mapping.is_namespaced());
        self.resources
            .list(&mapping, namespace)
            .await
            .map_err(|source| ClientError::Request {
                kind: kind_display(gvk),
                source,
            })
    }

    /// List objects of a statically typed kind, decoded through the registry
    pub async fn list_typed<K>(&self, namespace: Option<&str>) -> Result<Vec<K>, ClientError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let gvk = gvk_of::<K>();
        self.list(&gvk, namespace)
            .await?
            .into_iter()
            .map(|object| {
                self.registry
                    .decode::<K>(object)
                    .map_err(|e| ClientError::Decode {
                        kind: kind_display(&gvk),
                        message: e.to_string(),
                    })
            })
            .collect()
    }

    /// Server-side apply `object`
    ///
    /// A namespaced object without a namespace is placed in `default_namespace`.
    pub async fn apply(
        &self,
        object: &DynamicObject,
        default_namespace: &str,
    ) -> Result<DynamicObject, ClientError> {
        let gvk = object_gvk(object)?;
        let mapping = self.resolve(&gvk).await?;
        let namespace = target_namespace(&mapping, object, default_namespace);
        self.resources
            .apply(&mapping, namespace, object)
            .await
            .map_err(|source| ClientError::Request {
                kind: kind_display(&gvk),
                source,
            })
    }

    /// Create `object`, leaving an existing object of the same name untouched
    ///
    /// Namespaces are defaulted as in [`DynamicClient::apply`].
    pub async fn create(
        &self,
        object: &DynamicObject,
        default_namespace: &str,
    ) -> Result<CreateOutcome, ClientError> {
        let gvk = object_gvk(object)?;
        let mapping = self.resolve(&gvk).await?;
        let namespace = target_namespace(&mapping, object, default_namespace);
        self.resources
            .create(&mapping, namespace, object)
            .await
            .map_err(|source| ClientError::Request {
                kind: kind_display(&gvk),
                source,
            })
    }

    pub async fn delete(
        &self,
        gvk: &GroupVersionKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), ClientError> {
        let mapping = self.resolve(gvk).await?;
        let namespace = namespace.filter(|_| mapping.is_namespaced());
        self.resources
            .delete(&mapping, namespace, name)
            .await
            .map_err(|source| ClientError::Request {
                kind: kind_display(gvk),
                source,
            })
    }
}

fn target_namespace<'a>(
    mapping: &RestMapping,
    object: &'a DynamicObject,
    default_namespace: &'a str,
) -> Option<&'a str> {
    mapping.is_namespaced().then(|| {
        object
            .metadata
            .namespace
            .as_deref()
            .unwrap_or(default_namespace)
    })
}

/// Group/version/kind declared by an object's `apiVersion` and `kind`
pub fn object_gvk(object: &DynamicObject) -> Result<GroupVersionKind, ClientError> {
    let types = object.types.as_ref().ok_or_else(|| ClientError::Decode {
        kind: object.metadata.name.clone().unwrap_or_default(),
        message: "object has no apiVersion/kind".to_string(),
    })?;
    let (group, version) = types
        .api_version
        .split_once('/')
        .unwrap_or(("", types.api_version.as_str()));
    Ok(GroupVersionKind::gvk(group, version, &types.kind))
}
