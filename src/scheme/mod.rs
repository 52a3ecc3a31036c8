//! # Scheme
//!
//! The type registry and the convergence probe that decides when newly
//! registered kinds are actually served.

pub mod probe;
pub mod registry;

pub use probe::{wait_until_listable, ProbeConfig, ProbeState};
pub use registry::{
    add_builtin_kinds, add_extension_kinds, gvk_of, kind_display, AddToRegistryFn,
    RegisteredKind, TypeRegistry, BUILTIN_KIND_GROUPS,
};
