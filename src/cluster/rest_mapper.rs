//! # REST Mapper
//!
//! Deferred translation from a kind to the API location serving it.
//!
//! Mappings are resolved lazily through a memoizing discovery cache and kept
//! until [`RestMapper::reset`]. The mapper never notices new kinds on its own:
//! after the type registry changes, or after a lookup that may have been
//! answered from stale discovery data, it must be reset.

use crate::cluster::discovery::{DiscoveryClient, MemCacheDiscovery, ResourceScope};
use crate::scheme::registry::kind_display;
use anyhow::{anyhow, Result};
use kube::core::GroupVersionKind;
use kube::discovery::ApiResource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Where a kind is served
#[derive(Debug, Clone)]
pub struct RestMapping {
    pub resource: ApiResource,
    pub scope: ResourceScope,
}

impl RestMapping {
    #[must_use]
    pub fn is_namespaced(&self) -> bool {
        self.scope == ResourceScope::Namespaced
    }
}

pub struct RestMapper {
    discovery: MemCacheDiscovery,
    mappings: RwLock<HashMap<GroupVersionKind, RestMapping>>,
    resets: AtomicU64,
}

impl std::fmt::Debug for RestMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestMapper")
            .field("cached_mappings", &self.cached_mappings())
            .field("resets", &self.reset_count())
            .finish_non_exhaustive()
    }
}

impl RestMapper {
    /// A mapper with an empty cache in front of `discovery`
    #[must_use]
    pub fn new(discovery: Arc<dyn DiscoveryClient>) -> Self {
        Self {
            discovery: MemCacheDiscovery::new(discovery),
            mappings: RwLock::new(HashMap::new()),
            resets: AtomicU64::new(0),
        }
    }

    /// Discard every resolved mapping and the discovery data behind them
    pub fn reset(&self) {
        match self.mappings.write() {
            Ok(mut mappings) => mappings.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.discovery.invalidate();
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    /// How many times this mapper has been reset
    #[must_use]
    pub fn reset_count(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    /// Number of kinds currently resolved
    #[must_use]
    pub fn cached_mappings(&self) -> usize {
        match self.mappings.read() {
            Ok(mappings) => mappings.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Resolve the API location of `gvk`
    pub async fn mapping(&self, gvk: &GroupVersionKind) -> Result<RestMapping> {
        let cached = match self.mappings.read() {
            Ok(mappings) => mappings.get(gvk).cloned(),
            Err(poisoned) => poisoned.into_inner().get(gvk).cloned(),
        };
        if let Some(mapping) = cached {
            return Ok(mapping);
        }

        let served = self
            .discovery
            .server_resources_for_group_version(&gvk.group, &gvk.version)
            .await?;
        let found = served
            .into_iter()
            .find(|d| d.resource.kind == gvk.kind)
            .ok_or_else(|| {
                anyhow!(
                    "no matches for kind \"{}\" in version \"{}\"",
                    gvk.kind,
                    gvk.api_version()
                )
            })?;

        let mapping = RestMapping {
            resource: found.resource,
            scope: found.scope,
        };
        debug!(
            kind = %kind_display(gvk),
            plural = %mapping.resource.plural,
            namespaced = mapping.is_namespaced(),
            "Resolved REST mapping"
        );
        match self.mappings.write() {
            Ok(mut mappings) => mappings.insert(gvk.clone(), mapping.clone()),
            Err(poisoned) => poisoned.into_inner().insert(gvk.clone(), mapping.clone()),
        };
        Ok(mapping)
    }
}
