//! Cooperative cancellation
//!
//! A [`CancellationToken`] is shared between an operation and its producer.
//! Cancelling is idempotent; producers poll [`CancellationToken::is_cancelled`]
//! or await [`CancellationToken::cancelled`].

use std::sync::Arc;
use tokio::sync::watch;

/// Shared cancellation flag
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Token that is not cancelled
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag: Arc::new(flag) }
    }

    /// Request cancellation; returns `false` if it was already requested
    pub fn cancel(&self) -> bool {
        self.flag.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
