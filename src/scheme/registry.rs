//! # Type Registry
//!
//! The set of resource kinds the dynamic client is allowed to operate on,
//! together with how to decode them into typed objects.
//!
//! A registry is plain data. Sharing and locking are the framework's job:
//! the framework owns one authoritative registry behind a mutex and hands
//! immutable snapshots (`Arc<TypeRegistry>`) to the dynamic clients it builds.

use crate::error::RegistrationError;
use k8s_openapi::api::{
    apiserverinternal, autoscaling, batch, certificates, coordination, discovery, events, node,
    policy, scheduling, storagemigration,
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions;
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use kube::discovery::ApiResource;
use kube::Resource;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

/// A function that adds one or more kinds to a registry
///
/// Operator crates expose one of these next to their CRD types, the same way
/// they expose the CRD definitions themselves.
pub type AddToRegistryFn = fn(&mut TypeRegistry) -> Result<(), RegistrationError>;

/// A kind known to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredKind {
    pub gvk: GroupVersionKind,
    pub plural: String,
}

impl RegisteredKind {
    /// `group/version/Kind`, or `version/Kind` for the core group
    #[must_use]
    pub fn display_name(&self) -> String {
        kind_display(&self.gvk)
    }
}

/// Human-readable identity for a group/version/kind
#[must_use]
pub fn kind_display(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        format!("{}/{}", gvk.version, gvk.kind)
    } else {
        format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind)
    }
}

/// Group/version/kind of a statically typed resource
#[must_use]
pub fn gvk_of<K: Resource<DynamicType = ()>>() -> GroupVersionKind {
    GroupVersionKind::gvk(&K::group(&()), &K::version(&()), &K::kind(&()))
}

#[derive(Clone, Default)]
pub struct TypeRegistry {
    kinds: HashMap<GroupVersionKind, RegisteredKind>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.kinds.values().map(RegisteredKind::display_name).collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("kinds", &names).finish()
    }
}

impl TypeRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statically typed resource (built-in or `#[derive(CustomResource)]`)
    pub fn register<K: Resource<DynamicType = ()>>(&mut self) -> Result<(), RegistrationError> {
        self.insert(gvk_of::<K>(), K::plural(&()).into_owned())
    }

    /// Register a kind described at runtime
    pub fn register_api_resource(&mut self, resource: &ApiResource) -> Result<(), RegistrationError> {
        let gvk = GroupVersionKind::gvk(&resource.group, &resource.version, &resource.kind);
        self.insert(gvk, resource.plural.clone())
    }

    fn insert(&mut self, gvk: GroupVersionKind, plural: String) -> Result<(), RegistrationError> {
        if gvk.version.is_empty() || gvk.kind.is_empty() {
            return Err(RegistrationError::Invalid(format!(
                "kind and version are required, got '{}'",
                kind_display(&gvk)
            )));
        }
        if plural.is_empty() {
            return Err(RegistrationError::Invalid(format!(
                "{} has no plural resource name",
                kind_display(&gvk)
            )));
        }

        match self.kinds.get(&gvk) {
            // Re-registering the same kind is a no-op
            Some(existing) if existing.plural == plural => Ok(()),
            Some(existing) => Err(RegistrationError::Conflict {
                kind: kind_display(&gvk),
                existing: existing.plural.clone(),
                requested: plural,
            }),
            None => {
                self.kinds
                    .insert(gvk.clone(), RegisteredKind { gvk, plural });
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.contains_key(gvk)
    }

    #[must_use]
    pub fn get(&self, gvk: &GroupVersionKind) -> Option<&RegisteredKind> {
        self.kinds.get(gvk)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// All registered kinds, sorted by display name
    #[must_use]
    pub fn kinds(&self) -> Vec<&RegisteredKind> {
        let mut kinds: Vec<&RegisteredKind> = self.kinds.values().collect();
        kinds.sort_by_key(|k| k.display_name());
        kinds
    }

    /// Decode a dynamic object into its registered static type
    pub fn decode<K>(&self, object: DynamicObject) -> Result<K, RegistrationError>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let gvk = gvk_of::<K>();
        if !self.recognizes(&gvk) {
            return Err(RegistrationError::Invalid(format!(
                "{} is not registered",
                kind_display(&gvk)
            )));
        }
        object.try_parse::<K>().map_err(|e| {
            RegistrationError::Invalid(format!("cannot decode {}: {e}", kind_display(&gvk)))
        })
    }
}

macro_rules! register_kinds {
    ($registry:expr, $($kind:ty),+ $(,)?) => {{
        $( $registry.register::<$kind>()?; )+
        Ok(())
    }};
}

pub fn add_core_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::core::v1;
    register_kinds!(
        registry,
        v1::Binding,
        v1::ComponentStatus,
        v1::ConfigMap,
        v1::Endpoints,
        v1::Event,
        v1::LimitRange,
        v1::Namespace,
        v1::Node,
        v1::PersistentVolume,
        v1::PersistentVolumeClaim,
        v1::Pod,
        v1::PodTemplate,
        v1::ReplicationController,
        v1::ResourceQuota,
        v1::Secret,
        v1::Service,
        v1::ServiceAccount,
    )
}

pub fn add_apps_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::apps::v1;
    register_kinds!(
        registry,
        v1::ControllerRevision,
        v1::DaemonSet,
        v1::Deployment,
        v1::ReplicaSet,
        v1::StatefulSet,
    )
}

pub fn add_batch_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    register_kinds!(registry, batch::v1::CronJob, batch::v1::Job)
}

pub fn add_admissionregistration_kinds(
    registry: &mut TypeRegistry,
) -> Result<(), RegistrationError> {
    use k8s_openapi::api::admissionregistration::{v1, v1alpha1, v1beta1};
    register_kinds!(
        registry,
        v1::MutatingWebhookConfiguration,
        v1::ValidatingAdmissionPolicy,
        v1::ValidatingAdmissionPolicyBinding,
        v1::ValidatingWebhookConfiguration,
        v1alpha1::ValidatingAdmissionPolicy,
        v1alpha1::ValidatingAdmissionPolicyBinding,
        v1beta1::ValidatingAdmissionPolicy,
        v1beta1::ValidatingAdmissionPolicyBinding,
    )
}

pub fn add_auth_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::authentication::{
        v1 as authn_v1, v1alpha1 as authn_v1alpha1, v1beta1 as authn_v1beta1,
    };
    use k8s_openapi::api::authorization::v1 as authz_v1;
    register_kinds!(
        registry,
        authn_v1::SelfSubjectReview,
        authn_v1::TokenRequest,
        authn_v1::TokenReview,
        authn_v1alpha1::SelfSubjectReview,
        authn_v1beta1::SelfSubjectReview,
        authz_v1::LocalSubjectAccessReview,
        authz_v1::SelfSubjectAccessReview,
        authz_v1::SelfSubjectRulesReview,
        authz_v1::SubjectAccessReview,
    )
}

pub fn add_rbac_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::rbac::v1;
    register_kinds!(
        registry,
        v1::ClusterRole,
        v1::ClusterRoleBinding,
        v1::Role,
        v1::RoleBinding,
    )
}

pub fn add_autoscaling_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    register_kinds!(
        registry,
        autoscaling::v1::HorizontalPodAutoscaler,
        autoscaling::v1::Scale,
        autoscaling::v2::HorizontalPodAutoscaler,
    )
}

pub fn add_certificates_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    register_kinds!(
        registry,
        certificates::v1::CertificateSigningRequest,
        certificates::v1alpha1::ClusterTrustBundle,
    )
}

pub fn add_coordination_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    register_kinds!(registry, coordination::v1::Lease)
}

pub fn add_discovery_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    register_kinds!(registry, discovery::v1::EndpointSlice, events::v1::Event)
}

pub fn add_flowcontrol_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::flowcontrol::{v1, v1beta3};
    register_kinds!(
        registry,
        v1::FlowSchema,
        v1::PriorityLevelConfiguration,
        v1beta3::FlowSchema,
        v1beta3::PriorityLevelConfiguration,
    )
}

pub fn add_networking_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::networking::{v1, v1alpha1};
    register_kinds!(
        registry,
        v1::Ingress,
        v1::IngressClass,
        v1::NetworkPolicy,
        v1alpha1::IPAddress,
        v1alpha1::ServiceCIDR,
        node::v1::RuntimeClass,
    )
}

pub fn add_policy_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    register_kinds!(
        registry,
        policy::v1::Eviction,
        policy::v1::PodDisruptionBudget,
        scheduling::v1::PriorityClass,
    )
}

pub fn add_resource_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::resource::v1alpha2;
    register_kinds!(
        registry,
        v1alpha2::PodSchedulingContext,
        v1alpha2::ResourceClaim,
        v1alpha2::ResourceClaimParameters,
        v1alpha2::ResourceClaimTemplate,
        v1alpha2::ResourceClass,
        v1alpha2::ResourceClassParameters,
        v1alpha2::ResourceSlice,
    )
}

pub fn add_storage_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    use k8s_openapi::api::storage::{v1, v1alpha1};
    register_kinds!(
        registry,
        v1::CSIDriver,
        v1::CSINode,
        v1::CSIStorageCapacity,
        v1::StorageClass,
        v1::VolumeAttachment,
        v1alpha1::VolumeAttributesClass,
        storagemigration::v1alpha1::StorageVersionMigration,
        apiserverinternal::v1alpha1::StorageVersion,
    )
}

/// Registration functions for every built-in API group, one per group family
pub const BUILTIN_KIND_GROUPS: &[AddToRegistryFn] = &[
    add_core_kinds,
    add_apps_kinds,
    add_batch_kinds,
    add_admissionregistration_kinds,
    add_auth_kinds,
    add_rbac_kinds,
    add_autoscaling_kinds,
    add_certificates_kinds,
    add_coordination_kinds,
    add_discovery_kinds,
    add_flowcontrol_kinds,
    add_networking_kinds,
    add_policy_kinds,
    add_resource_kinds,
    add_storage_kinds,
];

/// Register every top-level kind the platform serves out of the box
pub fn add_builtin_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    for add in BUILTIN_KIND_GROUPS {
        add(registry)?;
    }
    Ok(())
}

/// Register the API extension kinds (custom resource definitions)
pub fn add_extension_kinds(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    registry.register::<apiextensions::v1::CustomResourceDefinition>()
}
