//! Success counter shared between the sync loop and progress reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Clonable handle over a shared success count.
///
/// All clones observe the same value; every write is visible to later reads
/// on any holder.
#[derive(Debug, Clone, Default)]
pub struct SuccessCounter {
    count: Arc<AtomicUsize>,
}

impl SuccessCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one success and return the new total.
    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
