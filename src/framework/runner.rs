//! # Command Test Runner
//!
//! Runs the tests as a child command (by default `cargo test --test e2e`)
//! with the framework's connection details exported to it.

use crate::config::TestType;
use crate::constants::{
    DEFAULT_TEST_COMMAND, KUBECONFIG_ENV, NAMESPACED_MANIFEST_ENV, RUST_TEST_THREADS_ENV,
    SETUP_FAILURE_EXIT_CODE, TEST_OPERATOR_NAMESPACE_ENV, TEST_TYPE_ENV,
};
use crate::error::HarnessError;
use crate::framework::suite::TestRunner;
use crate::framework::Framework;
use async_trait::async_trait;
use std::ffi::OsString;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self {
            program: DEFAULT_TEST_COMMAND[0].to_string(),
            args: DEFAULT_TEST_COMMAND[1..]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl CommandRunner {
    /// Runner for `command`; the first element is the program
    pub fn new(command: Vec<String>) -> Result<Self, HarnessError> {
        let mut command = command.into_iter();
        let program = command
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| HarnessError::configuration("test command is empty"))?;
        Ok(Self {
            program,
            args: command.collect(),
        })
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment exported to the test command
    #[must_use]
    pub fn environment(framework: &Framework) -> Vec<(&'static str, OsString)> {
        let mut env = Vec::new();
        if let Some(path) = framework.kubeconfig_path() {
            env.push((KUBECONFIG_ENV, path.as_os_str().to_owned()));
        }
        env.push((
            TEST_OPERATOR_NAMESPACE_ENV,
            OsString::from(framework.operator_namespace()),
        ));
        if let Some(path) = &framework.options().namespaced_manifest_path {
            env.push((NAMESPACED_MANIFEST_ENV, path.as_os_str().to_owned()));
        }
        env.push((TEST_TYPE_ENV, OsString::from(framework.test_type().as_str())));
        if framework.test_type() == TestType::Serial {
            env.push((RUST_TEST_THREADS_ENV, OsString::from("1")));
        }
        env
    }
}

#[async_trait]
impl TestRunner for CommandRunner {
    async fn run(&self, framework: Arc<Framework>) -> i32 {
        info!(program = %self.program, args = ?self.args, "Running tests");
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .envs(Self::environment(&framework))
            .status()
            .await;

        match status {
            // No code when killed by a signal
            Ok(status) => status.code().unwrap_or(SETUP_FAILURE_EXIT_CODE),
            Err(e) => {
                error!(program = %self.program, error = %e, "Failed to run tests");
                SETUP_FAILURE_EXIT_CODE
            }
        }
    }
}
