//! # Binary Build
//!
//! Producing the local operator binary before it is launched.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// What to build and where to put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Where the finished binary must end up
    pub binary_path: PathBuf,
    /// Directory of the operator's Cargo package
    pub package_path: PathBuf,
    /// Binary target inside that package
    pub bin_name: String,
}

/// Builds the operator binary
///
/// Building is blocking; callers run it off the async runtime.
pub trait BinaryBuilder: Send + Sync {
    fn build(&self, options: &BuildOptions) -> Result<()>;
}

/// Builds with `cargo build` and copies the artifact into place
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoBuilder;

impl CargoBuilder {
    fn target_dir(package_path: &Path) -> PathBuf {
        std::env::var_os("CARGO_TARGET_DIR")
            .filter(|v| !v.is_empty())
            .map_or_else(|| package_path.join("target"), PathBuf::from)
    }
}

impl BinaryBuilder for CargoBuilder {
    fn build(&self, options: &BuildOptions) -> Result<()> {
        let cargo = which::which("cargo").context("cargo binary not found in PATH")?;
        let manifest = options.package_path.join("Cargo.toml");

        info!(
            package = %options.package_path.display(),
            bin = %options.bin_name,
            "Building local operator"
        );
        let output = Command::new(&cargo)
            .arg("build")
            .arg("--manifest-path")
            .arg(&manifest)
            .arg("--bin")
            .arg(&options.bin_name)
            .output()
            .context("Failed to execute cargo build")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "cargo build of {} failed ({}): {}",
                options.bin_name,
                output.status,
                stderr.trim()
            );
        }

        let artifact = Self::target_dir(&options.package_path)
            .join("debug")
            .join(&options.bin_name);
        if let Some(parent) = options.binary_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::copy(&artifact, &options.binary_path).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                artifact.display(),
                options.binary_path.display()
            )
        })?;
        debug!(binary = %options.binary_path.display(), "Local operator binary ready");
        Ok(())
    }
}
