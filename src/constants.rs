//! # Constants
//!
//! Shared constants used throughout the harness.
//!
//! These values represent reasonable defaults and can be overridden via
//! command-line flags or environment variables where applicable.

/// Environment variable holding the kubeconfig file path
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Environment variable the operator reads to decide which namespace it watches.
/// Empty means cluster-wide.
pub const WATCH_NAMESPACE_ENV: &str = "WATCH_NAMESPACE";

/// Overrides the namespace taken from the kubeconfig context
pub const TEST_OPERATOR_NAMESPACE_ENV: &str = "TEST_OPERATOR_NAMESPACE";

/// Overrides the namespace handed to a local operator as `WATCH_NAMESPACE`
pub const TEST_WATCH_NAMESPACE_ENV: &str = "TEST_WATCH_NAMESPACE";

/// Exported to the test runner so test binaries can skip serial/parallel cases
pub const TEST_TYPE_ENV: &str = "E2E_TEST_TYPE";

/// Exported to the test runner with the namespaced permissions manifest path
pub const NAMESPACED_MANIFEST_ENV: &str = "E2E_NAMESPACED_MANIFEST";

/// libtest honours this to limit test threads
pub const RUST_TEST_THREADS_ENV: &str = "RUST_TEST_THREADS";

/// Namespace used for convergence probes when no operator namespace override is set
pub const DEFAULT_PROBE_NAMESPACE: &str = "default";

/// Namespace assumed when the kubeconfig context names none
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default interval between convergence probe attempts (milliseconds)
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 1000;

/// Default total budget for a convergence probe (seconds)
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// How long shutdown waits for the output capture tasks to drain (seconds)
pub const DEFAULT_OUTPUT_FLUSH_TIMEOUT_SECS: u64 = 5;

/// Directory (relative to the project root) the local operator binary is built into
pub const BUILD_BIN_DIR: &str = "build/_output/bin";

/// Suffix appended to the project name for the local operator binary
pub const LOCAL_BINARY_SUFFIX: &str = "-local";

/// Kubeconfig location relative to the home directory
pub const RECOMMENDED_HOME_KUBECONFIG: &str = ".kube/config";

/// Field manager used for server-side apply of manifests
pub const FIELD_MANAGER: &str = "operator-e2e-framework";

/// Banner printed ahead of the captured local operator output
pub const LOCAL_OPERATOR_OUTPUT_BANNER: &str = "------ Local operator output ------";

/// Exit code reported when a stage fails before tests could run
pub const SETUP_FAILURE_EXIT_CODE: i32 = 1;

/// Default test command run by the `e2e-suite` binary
pub const DEFAULT_TEST_COMMAND: &[&str] = &["cargo", "test", "--test", "e2e"];
