//! # Local Operator
//!
//! Building and running the operator under test as a subprocess of the
//! harness instead of inside the cluster.

pub mod build;
pub mod command;
pub mod process;

pub use build::{BinaryBuilder, BuildOptions, CargoBuilder};
pub use command::{local_binary_path, project_name, split_operator_args, LocalOperatorCommand};
pub use process::{write_report, OperatorProcess};

use crate::error::HarnessError;
use crate::framework::Framework;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Build options for the project rooted at `project_root`
pub fn build_options(framework: &Framework, project_root: &Path) -> Result<BuildOptions, HarnessError> {
    let options = framework.options();
    let bin_name = match &options.operator_bin {
        Some(bin) => bin.clone(),
        None => project_name(project_root)?,
    };
    Ok(BuildOptions {
        binary_path: local_binary_path(project_root)?,
        package_path: project_root.join(&options.operator_package),
        bin_name,
    })
}

/// Command that starts the built binary
///
/// The child gets the explicit kubeconfig, or the highest-priority default
/// one, and the framework's watch namespace.
#[must_use]
pub fn operator_command(framework: &Framework, binary_path: &Path) -> LocalOperatorCommand {
    LocalOperatorCommand::new(binary_path, &framework.options().local_operator_args)
        .kubeconfig(framework.kubeconfig_path())
        .watch_namespace(framework.watch_namespace())
}

/// Build the operator and start it
///
/// Blocks until the build finishes; the process itself is started without
/// waiting for it.
pub async fn launch(
    framework: &Framework,
    project_root: &Path,
    builder: Arc<dyn BinaryBuilder>,
) -> Result<OperatorProcess, HarnessError> {
    let options = build_options(framework, project_root)?;
    let binary_path = options.binary_path.clone();

    tokio::task::spawn_blocking(move || builder.build(&options))
        .await
        .context("Local operator build task panicked")
        .and_then(|result| result.context("Failed to build local operator binary"))
        .map_err(HarnessError::Process)?;

    let command = operator_command(framework, &binary_path);
    debug!(
        program = %command.program.display(),
        args = ?command.args,
        "Launching local operator"
    );
    OperatorProcess::launch(&command, framework.output_flush_timeout())
}
