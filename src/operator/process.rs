//! # Operator Process
//!
//! A running local operator. Standard output and standard error are captured
//! into one shared buffer and printed exactly once when the process is shut
//! down, or dropped without a shutdown.

use crate::constants::LOCAL_OPERATOR_OUTPUT_BANNER;
use crate::error::HarnessError;
use crate::operator::command::LocalOperatorCommand;
use anyhow::Context;
use std::io::Write;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type OutputBuffer = Arc<Mutex<Vec<u8>>>;

pub struct OperatorProcess {
    child: Child,
    pid: Option<u32>,
    output: OutputBuffer,
    capture: Vec<JoinHandle<()>>,
    flush_timeout: Duration,
    reported: bool,
}

impl std::fmt::Debug for OperatorProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorProcess")
            .field("pid", &self.pid)
            .field("reported", &self.reported)
            .finish_non_exhaustive()
    }
}

impl OperatorProcess {
    /// Start `command` without waiting for it
    ///
    /// Must be called within a tokio runtime.
    pub fn launch(
        command: &LocalOperatorCommand,
        flush_timeout: Duration,
    ) -> Result<Self, HarnessError> {
        let mut child = command
            .to_command()
            .spawn()
            .with_context(|| format!("Failed to run operator {}", command.program.display()))
            .map_err(HarnessError::Process)?;
        let pid = child.id();

        let output = OutputBuffer::default();
        let mut capture = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            capture.push(tokio::spawn(capture_stream(stdout, Arc::clone(&output))));
        }
        if let Some(stderr) = child.stderr.take() {
            capture.push(tokio::spawn(capture_stream(stderr, Arc::clone(&output))));
        }

        info!(pid = ?pid, program = %command.program.display(), "Started local operator");
        Ok(Self {
            child,
            pid,
            output,
            capture,
            flush_timeout,
            reported: false,
        })
    }

    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Everything captured so far
    #[must_use]
    pub fn captured_output(&self) -> Vec<u8> {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the process and print its output to stdout
    pub async fn shutdown(&mut self) {
        if let Some(output) = self.stop().await {
            if let Err(e) = write_report(&mut std::io::stdout().lock(), &output) {
                warn!(error = %e, "Failed to print local operator output");
            }
        }
    }

    /// Stop the process and write its output to `out`
    pub async fn shutdown_to<W: Write + ?Sized>(&mut self, out: &mut W) -> std::io::Result<()> {
        match self.stop().await {
            Some(output) => write_report(out, &output),
            None => Ok(()),
        }
    }

    /// Kill the process, drain the capture tasks and hand out the output
    ///
    /// A failure to kill is only logged. Returns `None` once the output has
    /// already been handed out.
    pub async fn stop(&mut self) -> Option<Vec<u8>> {
        if self.reported {
            return None;
        }

        if let Err(e) = self.child.start_kill() {
            warn!(pid = ?self.pid, error = %e, "Failed to stop local operator process");
        }
        match tokio::time::timeout(self.flush_timeout, self.child.wait()).await {
            Ok(Ok(status)) => debug!(pid = ?self.pid, %status, "Local operator exited"),
            Ok(Err(e)) => warn!(pid = ?self.pid, error = %e, "Failed to wait for local operator"),
            Err(_) => warn!(pid = ?self.pid, "Local operator did not exit in time"),
        }

        let capture = std::mem::take(&mut self.capture);
        if tokio::time::timeout(self.flush_timeout, futures::future::join_all(capture))
            .await
            .is_err()
        {
            warn!("Local operator output was still open after shutdown, printing what was captured");
        }

        self.reported = true;
        Some(self.captured_output())
    }

    /// Exit status, if the process has already exited
    pub fn try_exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                warn!(pid = ?self.pid, error = %e, "Failed to poll local operator process");
                None
            }
        }
    }
}

impl Drop for OperatorProcess {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        if let Err(e) = self.child.start_kill() {
            warn!(pid = ?self.pid, error = %e, "Failed to stop local operator process");
        }
        for task in &self.capture {
            task.abort();
        }
        self.reported = true;
        let output = self.captured_output();
        if let Err(e) = write_report(&mut std::io::stdout().lock(), &output) {
            warn!(error = %e, "Failed to print local operator output");
        }
    }
}
/// Write the banner followed by the captured output
pub fn write_report<W: Write + ?Sized>(out: &mut W, output: &[u8]) -> std::io::Result<()> {
    writeln!(out, "\n{LOCAL_OPERATOR_OUTPUT_BANNER}")?;
    out.write_all(output)?;
    writeln!(out)?;
    out.flush()
}

async fn capture_stream<R>(mut stream: R, output: OutputBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0_u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => output
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!(error = %e, "Local operator output stream closed");
                break;
            }
        }
    }
}
