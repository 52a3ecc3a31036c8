//! # e2e-suite
//!
//! Prepares a cluster for an operator's end-to-end tests, runs them and
//! cleans up afterwards.
//!
//! ```text
//! e2e-suite --root . --globalMan deploy/crds.yaml --localOperator -- cargo test --test e2e
//! ```
//!
//! The command after `--` is the test runner (default `cargo test --test e2e`).
//! Its exit code becomes the exit code of the suite.

use clap::Parser;
use operator_e2e_framework::cluster::Connection;
use operator_e2e_framework::config::{FrameworkOptions, HarnessConfig};
use operator_e2e_framework::framework::{CommandRunner, Framework, Suite};
use operator_e2e_framework::observability::init_tracing;
use operator_e2e_framework::tls::install_crypto_provider;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "e2e-suite", version, about = "Run operator end-to-end tests against a cluster")]
struct Cli {
    #[command(flatten)]
    options: FrameworkOptions,

    /// Test command to run once the cluster is prepared
    #[arg(last = true)]
    test_command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Must happen before any kube client is created
    install_crypto_provider();

    let cli = Cli::parse();
    let config = HarnessConfig::from_env();
    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to initialize logging: {e:#}");
    }

    let code = run(cli, &config).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run(cli: Cli, config: &HarnessConfig) -> i32 {
    let runner = if cli.test_command.is_empty() {
        CommandRunner::default()
    } else {
        match CommandRunner::new(cli.test_command) {
            Ok(runner) => runner,
            Err(e) => {
                error!(error = %e, "Invalid test command");
                return e.exit_code();
            }
        }
    };

    let connection = match Connection::connect(cli.options.explicit_kubeconfig()).await {
        Ok(connection) => connection,
        Err(e) => {
            error!(error = %e, "Failed to connect to the cluster");
            eprintln!("Error: {e}");
            return e.exit_code();
        }
    };

    let framework = Arc::new(Framework::new(connection, cli.options, config));
    let report = Suite::new().run(framework, &runner).await;
    if let Some(e) = &report.error {
        eprintln!("Error: {e}");
    }
    report.exit_code
}
