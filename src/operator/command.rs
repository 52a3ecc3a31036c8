//! # Local Operator Command
//!
//! Command line and environment for the operator subprocess.

use crate::constants::{BUILD_BIN_DIR, KUBECONFIG_ENV, LOCAL_BINARY_SUFFIX, WATCH_NAMESPACE_ENV};
use crate::error::HarnessError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Split the extra operator arguments on whitespace
///
/// An empty string yields no arguments.
#[must_use]
pub fn split_operator_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

/// Name of the project rooted at `project_root`
pub fn project_name(project_root: &Path) -> Result<String, HarnessError> {
    project_root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            HarnessError::configuration(format!(
                "cannot derive a project name from {}",
                project_root.display()
            ))
        })
}

/// `<root>/build/_output/bin/<project>-local`
pub fn local_binary_path(project_root: &Path) -> Result<PathBuf, HarnessError> {
    let name = project_name(project_root)?;
    Ok(project_root
        .join(BUILD_BIN_DIR)
        .join(format!("{name}{LOCAL_BINARY_SUFFIX}")))
}

/// The operator subprocess to start
///
/// The child inherits the harness environment; `env` entries override it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOperatorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, OsString)>,
}

impl LocalOperatorCommand {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: &str) -> Self {
        Self {
            program: program.into(),
            args: split_operator_args(args),
            env: Vec::new(),
        }
    }

    /// Point the operator at a kubeconfig file
    #[must_use]
    pub fn kubeconfig(self, path: Option<&Path>) -> Self {
        match path {
            Some(path) => self.env(KUBECONFIG_ENV, path.as_os_str()),
            None => self,
        }
    }

    /// Namespace the operator watches; empty means cluster-wide
    #[must_use]
    pub fn watch_namespace(self, namespace: &str) -> Self {
        self.env(WATCH_NAMESPACE_ENV, namespace)
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: impl Into<OsString>) -> Self {
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.env.push((key.to_string(), value)),
        }
        self
    }

    /// Value this command sets for `key`, if it overrides it
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&OsString> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The process to spawn, with stdout and stderr piped for capture
    #[must_use]
    pub fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}
