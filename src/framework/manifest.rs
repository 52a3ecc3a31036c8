//! # Manifests
//!
//! Reading multi-document YAML manifests and applying them through the
//! dynamic client.

use crate::cluster::dynamic::{object_gvk, CreateOutcome, DynamicClient};
use crate::error::HarnessError;
use crate::framework::cleanup::CleanupScope;
use crate::scheme::registry::kind_display;
use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::DynamicObject;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Read a manifest file
pub fn read_manifest(path: &Path) -> Result<Vec<u8>, HarnessError> {
    std::fs::read(path)
        .with_context(|| format!("Failed to read resource manifest {}", path.display()))
        .map_err(HarnessError::Configuration)
}

/// Split a multi-document YAML manifest into objects
///
/// Empty documents are skipped. Every object must carry `apiVersion`, `kind`
/// and `metadata.name`.
pub fn parse_manifest_documents(raw: &[u8]) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_slice(raw).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .with_context(|| format!("Failed to parse manifest document {index}"))?;
        if value.is_null() {
            continue;
        }
        let json = serde_json::to_value(&value)
            .with_context(|| format!("Manifest document {index} is not representable as JSON"))?;
        let object: DynamicObject = serde_json::from_value(json)
            .with_context(|| format!("Manifest document {index} is not a Kubernetes object"))?;
        if object.types.is_none() {
            anyhow::bail!("Manifest document {index} has no apiVersion/kind");
        }
        if object.metadata.name.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!("Manifest document {index} has no metadata.name");
        }
        objects.push(object);
    }
    Ok(objects)
}

/// Turns raw manifest bytes into live objects
#[async_trait]
pub trait ManifestApplier: Send + Sync {
    /// Apply every object in `raw`
    ///
    /// When `track_for_cleanup` is set, a delete for each created object is
    /// registered in `scope`.
    async fn apply_manifest(
        &self,
        client: &DynamicClient,
        raw: &[u8],
        track_for_cleanup: bool,
        scope: &CleanupScope,
        default_namespace: &str,
    ) -> Result<()>;
}

/// Creates manifest objects through the dynamic client
///
/// Objects that already exist are left alone and never tracked for cleanup,
/// so teardown only removes what this run created.
///
/// Every kind in the manifest must already be registered and served when the
/// manifest is applied. Objects of a custom resource whose definition appears
/// earlier in the same manifest fail as unregistered instead of waiting for
/// the definition to be established; install such kinds first and
/// register them with [`Framework::extend_scheme`](crate::Framework::extend_scheme).
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicManifestApplier;

#[async_trait]
impl ManifestApplier for DynamicManifestApplier {
    async fn apply_manifest(
        &self,
        client: &DynamicClient,
        raw: &[u8],
        track_for_cleanup: bool,
        scope: &CleanupScope,
        default_namespace: &str,
    ) -> Result<()> {
        let objects = parse_manifest_documents(raw)?;
        debug!(objects = objects.len(), "Applying manifest");

        for object in &objects {
            let gvk = object_gvk(object)?;
            let created = match client.create(object, default_namespace).await? {
                CreateOutcome::Created(created) => created,
                CreateOutcome::AlreadyExists => {
                    info!(
                        kind = %kind_display(&gvk),
                        name = object.metadata.name.as_deref().unwrap_or(""),
                        "Resource already exists, skipping"
                    );
                    continue;
                }
            };
            let name = created
                .metadata
                .name
                .clone()
                .or_else(|| object.metadata.name.clone())
                .unwrap_or_default();
            let namespace = created.metadata.namespace.clone();
            info!(
                kind = %kind_display(&gvk),
                name = %name,
                namespace = namespace.as_deref().unwrap_or(""),
                "Created resource"
            );

            if track_for_cleanup {
                let client = client.clone();
                let description = format!("delete {} {name}", kind_display(&gvk));
                scope.register(description, move || async move {
                    client.delete(&gvk, &name, namespace.as_deref()).await?;
                    Ok(())
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r"
apiVersion: v1
kind: Namespace
metadata:
  name: compliance
---
# trailing comment only
---
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
";

    #[test]
    fn test_parse_skips_empty_documents() {
        let objects = parse_manifest_documents(MANIFEST.as_bytes()).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].metadata.name.as_deref(), Some("compliance"));
        let crd_types = objects[1].types.as_ref().unwrap();
        assert_eq!(crd_types.api_version, "apiextensions.k8s.io/v1");
        assert_eq!(crd_types.kind, "CustomResourceDefinition");
        assert_eq!(objects[1].data["spec"]["group"], "example.com");
    }

    #[test]
    fn test_parse_rejects_objects_without_name() {
        let raw = "apiVersion: v1\nkind: ConfigMap\nmetadata: {}\n";
        let err = parse_manifest_documents(raw.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn test_parse_rejects_invalid_yaml() {
        assert!(parse_manifest_documents(b"kind: [unterminated").is_err());
    }

    #[test]
    fn test_read_missing_manifest_is_configuration_error() {
        let err = read_manifest(Path::new("/nonexistent/deploy/crds.yaml")).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }
}
