//! Cooperative cancellation token
//!
//! Long operations (pipeline runs, large diffs) check this token between
//! steps and between record batches. Cancellation never interrupts a
//! record mid-transformation; the holder observes the flag at the next
//! checkpoint and unwinds cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for one logical unit of work.
///
/// Cloning produces a handle to the same flag, so a caller can hand a
/// token to a background run and cancel it from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once `cancel` has been called on any clone of this token
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
