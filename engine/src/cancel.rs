//! Cooperative cancellation for batch fetches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation signal shared between a batch caller and its jobs.
///
/// Cancellation is cooperative: jobs observe the token between pipeline
/// stages and between retry attempts, never mid-request. In-flight network
/// calls run to completion (or their own timeout) before the token is
/// consulted again.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
