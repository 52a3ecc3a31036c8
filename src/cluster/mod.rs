//! # Cluster
//!
//! Everything the harness needs to talk to the API server: credentials,
//! discovery, REST mapping and the dynamic client.

pub mod backend;
pub mod connection;
pub mod credentials;
pub mod discovery;
pub mod dynamic;
pub mod rest_mapper;

pub use backend::KubeBackend;
pub use connection::Connection;
pub use credentials::{
    default_kubeconfig_path, kubeconfig_precedence, resolve_credentials_and_namespace, Credentials,
};
pub use discovery::{DiscoveredResource, DiscoveryClient, MemCacheDiscovery, ResourceScope};
pub use dynamic::{CreateOutcome, DynamicClient, ResourceClient};
pub use rest_mapper::{RestMapper, RestMapping};
