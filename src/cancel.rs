//! Cooperative cancellation for long-running bundles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::BundleError;

/// A cloneable cancellation flag with an optional deadline.
///
/// The walker, the rewriter, and the inliner poll [`check`](Self::check)
/// once per node they visit; a fired token aborts the bundle with
/// [`BundleError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// A token that only fires when [`cancel`](Self::cancel) is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also fires once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Fire the token. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// `true` once cancelled or past the deadline.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`BundleError::Cancelled`] if the token has fired.
    ///
    /// # Errors
    /// Returns [`BundleError::Cancelled`] when cancelled.
    pub fn check(&self) -> Result<(), BundleError> {
        if self.is_cancelled() {
            Err(BundleError::Cancelled)
        } else {
            Ok(())
        }
    }
}
