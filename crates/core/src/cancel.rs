//! Cooperative cancellation shared between the signal handler and the
//! operations it can interrupt.

use std::future::Future;
use tokio::sync::watch;

use crate::error::{HubError, Result};

/// Cloneable cancellation handle.
///
/// All clones observe the same state. Once cancelled, a token stays
/// cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so `wait_for` cannot observe a closed
        // channel while we are borrowed.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Await `fut`, giving up with [`HubError::Cancelled`] as soon as the
    /// token is cancelled. Hub requests go through this so that a stalled
    /// connection cannot outlive Ctrl+C.
    pub async fn run_until_cancelled<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(HubError::Cancelled),
            result = fut => result,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
