//! # Framework Options
//!
//! Command-line surface of the harness. Flag spellings follow the operator
//! SDK test framework so existing CI invocations keep working.

use clap::{Args, ValueEnum};
use std::fmt;
use std::path::PathBuf;

/// Which group of tests the runner should execute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TestType {
    /// Serial and parallel tests
    #[default]
    All,
    /// Only tests that must not share the cluster
    Serial,
    /// Only tests that tolerate concurrent execution
    Parallel,
}

impl TestType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::All => "all",
            TestType::Serial => "serial",
            TestType::Parallel => "parallel",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suite configuration supplied on the command line
#[derive(Debug, Clone, Args)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "each flag is an independent CLI switch"
)]
pub struct FrameworkOptions {
    /// Path to project root
    #[arg(long = "root", default_value = ".")]
    pub project_root: PathBuf,

    /// Path to kubeconfig (empty uses the default loading rules)
    #[arg(long = "kubeconfig")]
    pub kubeconfig_path: Option<PathBuf>,

    /// Path to rbac manifest
    #[arg(long = "namespacedMan")]
    pub namespaced_manifest_path: Option<PathBuf>,

    /// Path to operator manifest
    #[arg(long = "globalMan")]
    pub global_manifest_path: Option<PathBuf>,

    /// Enable if operator is running locally (not in cluster)
    #[arg(long = "localOperator")]
    pub local_operator: bool,

    /// Flags that the operator needs when running locally.
    /// Example: "--flag1 value1 --flag2=value2"
    #[arg(long = "localOperatorArgs", default_value = "", allow_hyphen_values = true)]
    pub local_operator_args: String,

    /// Skip the cleanup of all created artifacts if an error is faced
    #[arg(long = "skipCleanupOnError")]
    pub skip_cleanup_on_error: bool,

    /// Defines the type of tests to run
    #[arg(long = "testType", value_enum, default_value_t = TestType::All)]
    pub test_type: TestType,

    /// Directory containing the operator's Cargo package
    #[arg(long = "operatorPackage", default_value = ".")]
    pub operator_package: PathBuf,

    /// Binary target of the operator (defaults to the project directory name)
    #[arg(long = "operatorBin")]
    pub operator_bin: Option<String>,
}

impl Default for FrameworkOptions {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            kubeconfig_path: None,
            namespaced_manifest_path: None,
            global_manifest_path: None,
            local_operator: false,
            local_operator_args: String::new(),
            skip_cleanup_on_error: false,
            test_type: TestType::All,
            operator_package: PathBuf::from("."),
            operator_bin: None,
        }
    }
}

impl FrameworkOptions {
    /// Explicit kubeconfig path, treating an empty value as "not given"
    #[must_use]
    pub fn explicit_kubeconfig(&self) -> Option<&std::path::Path> {
        self.kubeconfig_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}
