use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::stats::{PoolStats, PoolStatus};
use crate::metrics;
use crate::task::TaskStatus;

/// Lets the pool count failed jobs in its stats.
pub trait JobOutcome {
    fn is_failure(&self) -> bool;
}

impl JobOutcome for () {
    fn is_failure(&self) -> bool {
        false
    }
}

impl JobOutcome for TaskStatus {
    fn is_failure(&self) -> bool {
        *self == TaskStatus::Failed
    }
}

impl<T: JobOutcome, E> JobOutcome for Result<T, E> {
    fn is_failure(&self) -> bool {
        self.as_ref().map_or(true, JobOutcome::is_failure)
    }
}

/// Marks one job as active until dropped, including on unwind.
struct ActiveSlot<'a> {
    stats: &'a PoolStats,
}

impl<'a> ActiveSlot<'a> {
    fn enter(stats: &'a PoolStats) -> Self {
        stats.active.fetch_add(1, Ordering::Relaxed);
        metrics::ACTIVE_ENCODERS.inc();
        Self { stats }
    }
}

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        metrics::ACTIVE_ENCODERS.dec();
        self.stats.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Fixed-size pool of execution slots.
#[derive(Clone)]
pub struct WorkerPool {
    size: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
}

impl WorkerPool {
    /// Creates a pool with `size` slots (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            semaphore: Arc::new(Semaphore::new(size)),
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Creates a pool with one slot per available processing unit.
    pub fn with_available_parallelism() -> Self {
        Self::new(num_cpus::get())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the current pool status.
    pub fn status(&self) -> PoolStatus {
        self.stats.to_status(self.size)
    }

    /// Runs `job` on the next free slot.
    ///
    /// Returns immediately. The job is only polled once it holds a slot, and the
    /// slot is released when the job's future completes. Jobs whose output is a
    /// failure count towards `total_failed`.
    pub fn submit<Fut>(&self, job: Fut) -> JoinHandle<Fut::Output>
    where
        Fut: Future + Send + 'static,
        Fut::Output: JobOutcome + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let stats = Arc::clone(&self.stats);
        stats.queued.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            // The semaphore is private to the pool and never closed
            let _permit = semaphore.acquire_owned().await.ok();
            stats.queued.fetch_sub(1, Ordering::Relaxed);

            let active = ActiveSlot::enter(&stats);
            let result = job.await;
            drop(active);

            stats.total_processed.fetch_add(1, Ordering::Relaxed);
            if result.is_failure() {
                stats.total_failed.fetch_add(1, Ordering::Relaxed);
            }
            result
        })
    }
}
