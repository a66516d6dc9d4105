//! Cooperative cancellation of print jobs
//!
//! The controller is held by whoever may abort a job (a UI button, a ctrl-c
//! handler); tokens are threaded through every asynchronous step of the job.
//! Cancelling never aborts in-flight network requests, their results are
//! simply discarded.

use std::sync::Arc;
use tokio::sync::watch;

/// Owner side of a cancellation flag
#[derive(Debug, Clone)]
pub struct CancellationController {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// A token observing this controller
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Request cancellation of every job holding one of our tokens
    pub fn cancel(&self) {
        log::info!("Print cancellation requested");
        self.tx.send_replace(true);
    }

    /// Arm the controller again for the next job
    pub fn reset(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observer side of a cancellation flag
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; pends forever otherwise
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Controller dropped without cancelling
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_token_observes_cancel() {
        let controller = CancellationController::new();
        let token = controller.token();
        assert!(!token.is_cancelled());

        controller.cancel();
        assert!(token.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("cancelled() should resolve");
    }

    #[tokio::test]
    async fn test_never_token_stays_pending() {
        let token = CancelToken::never();
        let result = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(result.is_err());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_reset_rearms() {
        let controller = CancellationController::new();
        controller.cancel();
        controller.reset();
        assert!(!controller.token().is_cancelled());
    }
}
