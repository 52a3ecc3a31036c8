//! # TLS
//!
//! kube uses rustls, which needs a process-wide crypto provider before the
//! first client is built.

/// Install ring as the rustls crypto provider
///
/// Returns `false` when a provider was already installed.
pub fn install_crypto_provider() -> bool {
    rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok()
}
