//! # Cleanup Scope
//!
//! Deferred teardown actions, run newest first. A failing action is logged
//! and the remaining ones still run.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

type CleanupAction = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

#[derive(Default)]
pub struct CleanupScope {
    actions: Mutex<Vec<(String, CleanupAction)>>,
}

impl std::fmt::Debug for CleanupScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupScope")
            .field("pending", &self.len())
            .finish()
    }
}

impl CleanupScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer `action` until [`CleanupScope::run`]
    pub fn register<F, Fut>(&self, description: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let action: CleanupAction = Box::new(move || action().boxed());
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((description.into(), action));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and drain every pending action in reverse registration order
    ///
    /// Returns the number of actions that failed.
    pub async fn run(&self) -> usize {
        let mut failures = 0;
        loop {
            let next = self
                .actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop();
            let Some((description, action)) = next else {
                break;
            };
            match action().await {
                Ok(()) => debug!(action = %description, "Cleaned up"),
                Err(e) => {
                    failures += 1;
                    warn!(action = %description, error = %format!("{e:#}"), "Cleanup action failed");
                }
            }
        }
        failures
    }

    /// Forget every pending action without running it
    pub fn discard(&self) -> usize {
        let mut actions = self.actions.lock().unwrap_or_else(PoisonError::into_inner);
        let count = actions.len();
        actions.clear();
        count
    }
}
