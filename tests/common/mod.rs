//! Common test utilities
//!
//! rustls initialization, an in-memory fake cluster that serves discovery and
//! resource requests, fake collaborators for the suite, and small custom
//! resource types to register.

#![allow(dead_code, reason = "each test binary uses a different subset of the helpers")]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use kube::CustomResource;
use operator_e2e_framework::cluster::{
    Connection, CreateOutcome, Credentials, DiscoveredResource, DiscoveryClient, ResourceClient,
    ResourceScope, RestMapping,
};
use operator_e2e_framework::config::{FrameworkOptions, HarnessConfig};
use operator_e2e_framework::framework::{
    CleanupScope, Framework, ManifestApplier, NamespaceContext, TestRunner,
};
use operator_e2e_framework::cluster::DynamicClient;
use operator_e2e_framework::operator::{BinaryBuilder, BuildOptions};
use operator_e2e_framework::RegistrationError;
use operator_e2e_framework::scheme::TypeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Must run before the first kube client is built.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        operator_e2e_framework::tls::install_crypto_provider();
    });
}

// Custom resources registered by the tests

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize)]
#[kube(
    group = "compliance.openshift.io",
    version = "v1alpha1",
    kind = "ComplianceScan",
    namespaced,
    schema = "disabled"
)]
pub struct ComplianceScanSpec {
    #[serde(default)]
    pub profile: String,
}

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize)]
#[kube(
    group = "compliance.openshift.io",
    version = "v1alpha1",
    kind = "ComplianceSuite",
    namespaced,
    schema = "disabled"
)]
pub struct ComplianceSuiteSpec {
    #[serde(default)]
    pub auto_apply_remediations: bool,
}

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize)]
#[kube(
    group = "compliance.openshift.io",
    version = "v1alpha1",
    kind = "ProfileBundle",
    schema = "disabled"
)]
pub struct ProfileBundleSpec {
    #[serde(default)]
    pub content_image: String,
}

pub fn add_compliance_scan(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    registry.register::<ComplianceScan>()
}

pub fn add_compliance_suite(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    registry.register::<ComplianceSuite>()
}

pub fn add_profile_bundle(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    registry.register::<ProfileBundle>()
}

// Fake cluster

struct FakeKind {
    resource: ApiResource,
    scope: ResourceScope,
    /// Discovery queries that still omit the kind
    hidden_for: u32,
    /// Discovery queries that still report a wrong plural
    stale: Option<(String, u32)>,
}

/// In-memory API server
///
/// Discovery and lists consult the same set of kinds. A list fails unless the
/// requested plural is the one the kind is really served under.
#[derive(Default)]
pub struct FakeCluster {
    kinds: Mutex<Vec<FakeKind>>,
    failing_lists: Mutex<HashSet<String>>,
    objects: Mutex<BTreeMap<(String, Option<String>, String), DynamicObject>>,
    events: Mutex<Vec<String>>,
    discovery_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeCluster {
    /// Serves ConfigMap, Namespace and CustomResourceDefinition
    pub fn with_builtin_kinds() -> Arc<Self> {
        let cluster = Self::default();
        cluster.serve(
            ApiResource::erase::<k8s_openapi::api::core::v1::ConfigMap>(&()),
            ResourceScope::Namespaced,
        );
        cluster.serve(
            ApiResource::erase::<k8s_openapi::api::core::v1::Namespace>(&()),
            ResourceScope::Cluster,
        );
        cluster.serve(
            ApiResource::erase::<
                k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
            >(&()),
            ResourceScope::Cluster,
        );
        Arc::new(cluster)
    }

    pub fn serve(&self, resource: ApiResource, scope: ResourceScope) {
        self.serve_after(resource, scope, 0);
    }

    /// Serve a kind that stays invisible for the first `queries` discovery
    /// queries of its group/version
    pub fn serve_after(&self, resource: ApiResource, scope: ResourceScope, queries: u32) {
        self.kinds.lock().unwrap().push(FakeKind {
            resource,
            scope,
            hidden_for: queries,
            stale: None,
        });
    }

    /// Serve a kind whose discovery data carries `stale_plural` for the first
    /// `queries` discovery queries
    pub fn serve_stale(
        &self,
        resource: ApiResource,
        scope: ResourceScope,
        stale_plural: &str,
        queries: u32,
    ) {
        self.kinds.lock().unwrap().push(FakeKind {
            resource,
            scope,
            hidden_for: 0,
            stale: Some((stale_plural.to_string(), queries)),
        });
    }

    /// Make every list of `plural` fail
    pub fn fail_lists(&self, plural: &str) {
        self.failing_lists.lock().unwrap().insert(plural.to_string());
    }

    pub fn discovery_calls(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Everything the fake served, in order (`discover g/v`, `list plural`,
    /// `create plural/name`, ...)
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .map(|(plural, _, name)| format!("{plural}/{name}"))
            .collect()
    }

    /// Store an object as if something outside the harness had created it
    pub fn insert_object(&self, resource: &ApiResource, namespace: Option<&str>, name: &str) {
        let object = DynamicObject::new(name, resource);
        self.objects.lock().unwrap().insert(
            (
                resource.plural.clone(),
                namespace.map(str::to_string),
                name.to_string(),
            ),
            object,
        );
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn check_served(&self, mapping: &RestMapping) -> Result<()> {
        let kinds = self.kinds.lock().unwrap();
        let served = kinds.iter().any(|k| {
            k.hidden_for == 0
                && k.resource.kind == mapping.resource.kind
                && k.resource.plural == mapping.resource.plural
        });
        if !served {
            bail!("the server could not find the requested resource");
        }
        if self
            .failing_lists
            .lock()
            .unwrap()
            .contains(&mapping.resource.plural)
        {
            bail!("etcdserver: request timed out");
        }
        Ok(())
    }
}

#[async_trait]
impl DiscoveryClient for FakeCluster {
    async fn server_resources_for_group_version(
        &self,
        group: &str,
        version: &str,
    ) -> Result<Vec<DiscoveredResource>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("discover {group}/{version}"));

        let mut kinds = self.kinds.lock().unwrap();
        let mut served = Vec::new();
        for kind in kinds
            .iter_mut()
            .filter(|k| k.resource.group == group && k.resource.version == version)
        {
            if kind.hidden_for > 0 {
                kind.hidden_for -= 1;
                continue;
            }
            let mut resource = kind.resource.clone();
            if let Some((plural, remaining)) = &mut kind.stale {
                if *remaining > 0 {
                    *remaining -= 1;
                    resource.plural = plural.clone();
                }
            }
            served.push(DiscoveredResource {
                resource,
                scope: kind.scope,
            });
        }
        Ok(served)
    }
}

#[async_trait]
impl ResourceClient for FakeCluster {
    async fn list(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("list {}", mapping.resource.plural));
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        self.check_served(mapping)?;

        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((plural, ns, _), _)| {
                plural == &mapping.resource.plural
                    && (namespace.is_none() || ns.as_deref() == namespace)
            })
            .map(|(_, object)| object.clone())
            .collect())
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
            .clone()
            .ok_or_else(|| anyhow!("object has no name"))?;
        self.record(format!("apply {}/{name}", mapping.resource.plural));
        self.check_served(mapping)?;

        let mut stored = object.clone();
        stored.metadata.namespace = namespace.map(str::to_string);
        self.objects.lock().unwrap().insert(
            (
                mapping.resource.plural.clone(),
                namespace.map(str::to_string),
                name,
            ),
            stored.clone(),
        );
        Ok(stored)
    }

    async fn create(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> Result<CreateOutcome> {
        let name = object
            .metadata
            .name
            .clone()
            .ok_or_else(|| anyhow!("object has no name"))?;
        self.record(format!("create {}/{name}", mapping.resource.plural));
        self.check_served(mapping)?;

        let key = (
            mapping.resource.plural.clone(),
            namespace.map(str::to_string),
            name,
        );
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let mut stored = object.clone();
        stored.metadata.namespace = namespace.map(str::to_string);
        objects.insert(key, stored.clone());
        Ok(CreateOutcome::Created(stored))
    }

    async fn delete(&self, mapping: &RestMapping, namespace: Option<&str>, name: &str) -> Result<()> {
        self.record(format!("delete {}/{name}", mapping.resource.plural));
        let key = (
            mapping.resource.plural.clone(),
            namespace.map(str::to_string),
            name.to_string(),
        );
        match self.objects.lock().unwrap().remove(&key) {
            Some(_) => Ok(()),
            None => bail!("{}/{name} not found", mapping.resource.plural),
        }
    }
}

// Framework construction

pub const TEST_KUBECONFIG: &str = "/tmp/e2e-framework-tests/kubeconfig";

/// Framework over `cluster` with credential namespace `ops` and no
/// namespace overrides
///
/// Must be called inside a tokio runtime.
pub fn test_framework(cluster: &Arc<FakeCluster>, options: FrameworkOptions) -> Framework {
    test_framework_with_config(cluster, options, &HarnessConfig::default())
}

pub fn test_framework_with_config(
    cluster: &Arc<FakeCluster>,
    options: FrameworkOptions,
    config: &HarnessConfig,
) -> Framework {
    Framework::with_namespaces(
        test_connection(cluster),
        options,
        config,
        NamespaceContext::resolve("ops", None, None),
    )
}

/// Connection over `cluster` whose credentials name namespace `ops`
///
/// Must be called inside a tokio runtime.
pub fn test_connection(cluster: &Arc<FakeCluster>) -> Connection {
    init_rustls();
    let kube_config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
    let client = kube::Client::try_from(kube_config.clone()).unwrap();
    let credentials = Credentials {
        config: kube_config,
        kubeconfig_path: Some(PathBuf::from(TEST_KUBECONFIG)),
        namespace: "ops".to_string(),
    };
    Connection::assemble(
        credentials,
        client,
        Arc::clone(cluster) as Arc<dyn DiscoveryClient>,
        Arc::clone(cluster) as Arc<dyn ResourceClient>,
    )
    .unwrap()
}

// Fake operator binaries

/// Write an executable `/bin/sh` script to `path`
pub fn write_script(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Script of an operator that reports its arguments and environment, then
/// runs until killed
pub const CHATTY_OPERATOR: &str = r#"echo "operator starting"
echo "argc=$#"
echo "args=$*"
echo "watch=$WATCH_NAMESPACE"
echo "kubeconfig=$KUBECONFIG"
echo "leader election lost" 1>&2
exec sleep 30"#;

/// Script of an operator that never writes anything
pub const SILENT_OPERATOR: &str = "exec sleep 30";

/// Builder that writes a script instead of compiling
pub struct ScriptBuilder {
    script: String,
    fail: bool,
    pub builds: Mutex<Vec<BuildOptions>>,
}

impl ScriptBuilder {
    pub fn new(script: &str) -> Arc<Self> {
        Arc::new(Self {
            script: script.to_string(),
            fail: false,
            builds: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: String::new(),
            fail: true,
            builds: Mutex::new(Vec::new()),
        })
    }
}

impl BinaryBuilder for ScriptBuilder {
    fn build(&self, options: &BuildOptions) -> Result<()> {
        self.builds.lock().unwrap().push(options.clone());
        if self.fail {
            bail!("error[E0425]: cannot find value `reconciler` in this scope");
        }
        write_script(&options.binary_path, &self.script);
        Ok(())
    }
}

/// Wait (real time) until `condition` holds, up to five seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    condition()
}

// Fake suite collaborators

/// Applier that records manifests and registers one cleanup action per call
#[derive(Default)]
pub struct RecordingApplier {
    pub fail: bool,
    pub applied: Mutex<Vec<Vec<u8>>>,
    pub cleaned_up: Arc<AtomicUsize>,
}

#[async_trait]
impl ManifestApplier for RecordingApplier {
    async fn apply_manifest(
        &self,
        _client: &DynamicClient,
        raw: &[u8],
        track_for_cleanup: bool,
        scope: &CleanupScope,
        _default_namespace: &str,
    ) -> Result<()> {
        if self.fail {
            bail!("admission webhook denied the request");
        }
        self.applied.lock().unwrap().push(raw.to_vec());
        if track_for_cleanup {
            let cleaned_up = Arc::clone(&self.cleaned_up);
            scope.register("delete global manifest", move || async move {
                cleaned_up.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        Ok(())
    }
}

/// What a [`FakeRunner`] does when invoked
#[derive(Clone, Copy)]
pub enum RunnerBehavior {
    Exit(i32),
    Panic,
}

pub struct FakeRunner {
    behavior: RunnerBehavior,
    pub invocations: AtomicUsize,
}

impl FakeRunner {
    pub fn new(behavior: RunnerBehavior) -> Self {
        Self {
            behavior,
            invocations: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TestRunner for FakeRunner {
    async fn run(&self, _framework: Arc<Framework>) -> i32 {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            RunnerBehavior::Exit(code) => code,
            RunnerBehavior::Panic => panic!("test binary crashed"),
        }
    }
}
