use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Status of the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Number of execution slots.
    pub size: usize,
    /// Jobs currently holding a slot.
    pub active_jobs: usize,
    /// Jobs waiting for a slot.
    pub queued_jobs: usize,
    /// Jobs finished since the pool was created.
    pub total_processed: u64,
    /// Finished jobs whose outcome was a failure.
    pub total_failed: u64,
}

/// Tracks statistics for the pool.
#[derive(Default)]
pub(crate) struct PoolStats {
    pub(crate) active: AtomicU64,
    pub(crate) queued: AtomicU64,
    pub(crate) total_processed: AtomicU64,
    pub(crate) total_failed: AtomicU64,
}

impl PoolStats {
    pub(crate) fn to_status(&self, size: usize) -> PoolStatus {
        PoolStatus {
            size,
            active_jobs: self.active.load(Ordering::Relaxed) as usize,
            queued_jobs: self.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}
