//! # Discovery
//!
//! What the API server says it serves, per group/version, and an in-memory
//! cache in front of it so repeated lookups avoid network round-trips.

use anyhow::Result;
use async_trait::async_trait;
use kube::discovery::{ApiResource, Scope};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Whether a resource lives inside a namespace or at cluster scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

impl From<&Scope> for ResourceScope {
    fn from(scope: &Scope) -> Self {
        match scope {
            Scope::Namespaced => ResourceScope::Namespaced,
            Scope::Cluster => ResourceScope::Cluster,
        }
    }
}

/// One resource served by the API server
#[derive(Debug, Clone)]
pub struct DiscoveredResource {
    pub resource: ApiResource,
    pub scope: ResourceScope,
}

/// Source of API discovery information
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Resources the server currently serves for `group/version`
    ///
    /// The core group is addressed with an empty `group`.
    async fn server_resources_for_group_version(
        &self,
        group: &str,
        version: &str,
    ) -> Result<Vec<DiscoveredResource>>;
}

/// Memoizing wrapper around a [`DiscoveryClient`]
///
/// Entries live until [`MemCacheDiscovery::invalidate`] is called. Failed
/// lookups are never cached.
pub struct MemCacheDiscovery {
    inner: Arc<dyn DiscoveryClient>,
    groups: RwLock<HashMap<String, Vec<DiscoveredResource>>>,
}

impl std::fmt::Debug for MemCacheDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemCacheDiscovery")
            .field("cached_group_versions", &self.cached_group_versions())
            .finish_non_exhaustive()
    }
}

impl MemCacheDiscovery {
    #[must_use]
    pub fn new(inner: Arc<dyn DiscoveryClient>) -> Self {
        Self {
            inner,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Drop everything cached so far
    pub fn invalidate(&self) {
        match self.groups.write() {
            Ok(mut groups) => groups.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Number of group/versions currently cached
    #[must_use]
    pub fn cached_group_versions(&self) -> usize {
        match self.groups.read() {
            Ok(groups) => groups.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn cached(&self, key: &str) -> Option<Vec<DiscoveredResource>> {
        match self.groups.read() {
            Ok(groups) => groups.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }
}

#[async_trait]
impl DiscoveryClient for MemCacheDiscovery {
    async fn server_resources_for_group_version(
        &self,
        group: &str,
        version: &str,
    ) -> Result<Vec<DiscoveredResource>> {
        let key = format!("{group}/{version}");
        if let Some(resources) = self.cached(&key) {
            return Ok(resources);
        }

        debug!(group_version = %key, "Discovery cache miss, querying API server");
        let resources = self
            .inner
            .server_resources_for_group_version(group, version)
            .await?;

        match self.groups.write() {
            Ok(mut groups) => groups.insert(key, resources.clone()),
            Err(poisoned) => poisoned.into_inner().insert(key, resources.clone()),
        };
        Ok(resources)
    }
}
