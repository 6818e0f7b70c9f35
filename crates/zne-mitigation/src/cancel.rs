//! Cooperative cancellation for extrapolation runs.

use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable flag that stops an extrapolation run.
///
/// Cancelling any clone cancels them all. A run checks the token before
/// dispatching and races it against every in-flight sample; once it fires,
/// outstanding executor calls are aborted and the run reports
/// [`MitigationError::Cancelled`](crate::MitigationError::Cancelled).
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancel every clone of this token.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Check whether the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as any clone, so this is unreachable.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
