//! # Suite Orchestration
//!
//! Drives one end-to-end run:
//!
//! `Init -> ManifestsInstalled -> [OperatorStarted] -> TestsRunning -> Cleanup -> Done`
//!
//! Any failure before `TestsRunning` aborts the run with a synthesized
//! non-zero exit code. `Cleanup` is reached on every path, including a
//! panicking test runner: the local operator is always shut down and its
//! output printed, and the resources created during setup are released
//! unless cleanup was asked to be skipped for a failed run.

use crate::constants::SETUP_FAILURE_EXIT_CODE;
use crate::error::HarnessError;
use crate::framework::cleanup::CleanupScope;
use crate::framework::manifest::{read_manifest, DynamicManifestApplier, ManifestApplier};
use crate::framework::Framework;
use crate::operator::build::{BinaryBuilder, CargoBuilder};
use crate::operator::process::{write_report, OperatorProcess};
use anyhow::Context;
use async_trait::async_trait;
use futures::FutureExt;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// Stages of a suite run, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteStage {
    Init,
    ManifestsInstalled,
    OperatorStarted,
    TestsRunning,
    Cleanup,
    Done,
}

/// Executes the tests once the cluster is prepared
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run the tests and return their exit code
    async fn run(&self, framework: Arc<Framework>) -> i32;
}

/// Outcome of [`Suite::run`]
#[derive(Debug)]
pub struct SuiteReport {
    pub exit_code: i32,
    /// The setup failure that kept tests from running
    pub error: Option<HarnessError>,
    pub stages: Vec<SuiteStage>,
    pub cleanup_skipped: bool,
    pub cleanup_failures: usize,
}

type OutputSink = Arc<Mutex<dyn Write + Send>>;

pub struct Suite {
    applier: Arc<dyn ManifestApplier>,
    builder: Arc<dyn BinaryBuilder>,
    operator_output: Option<OutputSink>,
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("custom_operator_output", &self.operator_output.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}

impl Suite {
    /// Suite applying manifests through the dynamic client and building the
    /// local operator with cargo
    #[must_use]
    pub fn new() -> Self {
        Self {
            applier: Arc::new(DynamicManifestApplier),
            builder: Arc::new(CargoBuilder),
            operator_output: None,
        }
    }

    #[must_use]
    pub fn with_applier(mut self, applier: Arc<dyn ManifestApplier>) -> Self {
        self.applier = applier;
        self
    }

    #[must_use]
    pub fn with_builder(mut self, builder: Arc<dyn BinaryBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Print local operator output to `sink` instead of stdout
    #[must_use]
    pub fn with_operator_output(mut self, sink: OutputSink) -> Self {
        self.operator_output = Some(sink);
        self
    }

    /// Run the whole suite
    ///
    /// A panic during setup or in `runner` is resumed after cleanup.
    pub async fn run(&self, framework: Arc<Framework>, runner: &dyn TestRunner) -> SuiteReport {
        let scope = CleanupScope::new();
        let mut stages = vec![SuiteStage::Init];
        let mut operator = None;

        let setup = AssertUnwindSafe(self.setup(&framework, &scope, &mut stages, &mut operator))
            .catch_unwind()
            .await;

        let mut panic = None;
        let (exit_code, error) = match setup {
            Ok(Ok(())) => {
                stages.push(SuiteStage::TestsRunning);
                match AssertUnwindSafe(runner.run(Arc::clone(&framework)))
                    .catch_unwind()
                    .await
                {
                    Ok(code) => (code, None),
                    Err(payload) => {
                        error!("Test runner panicked");
                        panic = Some(payload);
                        (SETUP_FAILURE_EXIT_CODE, None)
                    }
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Suite setup failed");
                (e.exit_code(), Some(e))
            }
            Err(payload) => {
                error!("Suite setup panicked");
                panic = Some(payload);
                (SETUP_FAILURE_EXIT_CODE, None)
            }
        };

        stages.push(SuiteStage::Cleanup);
        if let Some(process) = operator.as_mut() {
            self.shutdown_operator(process).await;
        }

        let failed = exit_code != 0 || error.is_some() || panic.is_some();
        let cleanup_skipped = failed && framework.options().skip_cleanup_on_error;
        let cleanup_failures = if cleanup_skipped {
            let skipped = scope.discard();
            warn!(skipped, "Skipping cleanup of created resources after failure");
            0
        } else {
            scope.run().await
        };
        stages.push(SuiteStage::Done);

        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }

        info!(exit_code, "Suite finished");
        SuiteReport {
            exit_code,
            error,
            stages,
            cleanup_skipped,
            cleanup_failures,
        }
    }

    async fn setup(
        &self,
        framework: &Framework,
        scope: &CleanupScope,
        stages: &mut Vec<SuiteStage>,
        operator: &mut Option<OperatorProcess>,
    ) -> Result<(), HarnessError> {
        let options = framework.options();
        std::env::set_current_dir(&options.project_root)
            .with_context(|| {
                format!(
                    "Failed to change directory to project root {}",
                    options.project_root.display()
                )
            })
            .map_err(HarnessError::Configuration)?;
        let project_root = std::env::current_dir()
            .context("Failed to resolve the project root")
            .map_err(HarnessError::Configuration)?;

        if let Some(path) = &options.global_manifest_path {
            let raw = read_manifest(path)?;
            self.applier
                .apply_manifest(
                    &framework.client(),
                    &raw,
                    true,
                    scope,
                    framework.operator_namespace(),
                )
                .await
                .context("Failed to create resource(s) in global resource manifest")
                .map_err(HarnessError::Manifest)?;
        }
        stages.push(SuiteStage::ManifestsInstalled);

        if framework.is_local_operator() {
            let process =
                crate::operator::launch(framework, &project_root, Arc::clone(&self.builder))
                    .await?;
            *operator = Some(process);
            stages.push(SuiteStage::OperatorStarted);
        }
        Ok(())
    }

    async fn shutdown_operator(&self, process: &mut OperatorProcess) {
        match &self.operator_output {
            None => process.shutdown().await,
            Some(sink) => {
                if let Some(output) = process.stop().await {
                    let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Err(e) = write_report(&mut *sink, &output) {
                        warn!(error = %e, "Failed to write local operator output");
                    }
                }
            }
        }
    }
}
