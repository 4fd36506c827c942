//! Shutdown coordination for the background saver and loader.
//!
//! The application flips the shared state once a termination signal arrives;
//! background tasks observe it between passes and exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across tasks.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Set once shutdown has been initiated - no new background passes start
    shutdown_initiated: Arc<AtomicBool>,
    /// Wakes tasks waiting in [`ShutdownState::wait`]
    notify: Arc<Notify>,
}

impl ShutdownState {
    /// Creates a new shutdown state that has not been triggered.
    pub fn new() -> Self {
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Initiates shutdown and wakes every waiting task.
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated - background region tasks will stop");
        }
        self.notify.notify_waiters();
    }

    /// Resolves once shutdown has been initiated.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_shutdown_initiated() {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_after_initiate() {
        let state = ShutdownState::new();
        assert!(!state.is_shutdown_initiated());

        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        state.initiate_shutdown();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
        assert!(state.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_wait_after_initiate_is_immediate() {
        let state = ShutdownState::new();
        state.initiate_shutdown();
        tokio::time::timeout(Duration::from_millis(100), state.wait())
            .await
            .expect("already shut down");
    }
}
