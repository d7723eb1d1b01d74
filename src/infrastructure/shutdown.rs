//! Graceful Shutdown Handler
//!
//! Signals the HTTP server to stop accepting connections and drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shutdown coordinator for graceful termination.
#[derive(Clone, Default)]
pub struct ShutdownController {
    /// Whether shutdown has been initiated
    shutdown_initiated: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initiate graceful shutdown. Idempotent.
    pub fn shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            tracing::info!("initiating graceful shutdown");
            self.notify.notify_waiters();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been initiated.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_shutdown() {
            return;
        }
        notified.await;
    }
}

/// Install signal handlers and trigger `controller` on Ctrl+C or SIGTERM.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }

    controller.shutdown();
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_initiates_once() {
        let controller = ShutdownController::new();
        assert!(!controller.is_shutdown());

        controller.shutdown();
        assert!(controller.is_shutdown());

        // Calling again should be idempotent
        controller.shutdown();
        assert!(controller.is_shutdown());
    }

    #[tokio::test]
    async fn test_wait_returns_after_shutdown() {
        let controller = ShutdownController::new();
        let waiter = controller.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.shutdown();

        let result = tokio::time::timeout(Duration::from_millis(200), handle).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_after_shutdown_is_immediate() {
        let controller = ShutdownController::new();
        controller.shutdown();

        let result = tokio::time::timeout(Duration::from_millis(50), controller.wait()).await;
        assert!(result.is_ok());
    }
}
