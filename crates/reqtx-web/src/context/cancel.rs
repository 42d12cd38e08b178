use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation signal for one request.
///
/// `CancellationToken::none()` never fires; it is handed to cleanup calls
/// (rollback) that must not be interrupted once started.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Option<Arc<Inner>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            })),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn cancel(&self) {
        if let Some(inner) = &self.inner {
            if !inner.cancelled.swap(true, Ordering::AcqRel) {
                inner.notify.notify_waiters();
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner
            .as_ref()
            .map(|i| i.cancelled.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Resolves once `cancel` has been called. Pending forever for `none()`.
    pub async fn cancelled(&self) {
        let Some(inner) = &self.inner else {
            return std::future::pending().await;
        };
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = inner.notify.notified();
            if inner.cancelled.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("suppressed", &self.inner.is_none())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
