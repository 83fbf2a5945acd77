//! Bounded worker pool.
//!
//! A fixed number of execution slots, one tokio semaphore permit each. Jobs
//! submitted beyond that wait in the semaphore's queue (unbounded) until a slot
//! frees up; they are not guaranteed to start in submission order.

mod stats;
mod worker_pool;

pub use stats::PoolStatus;
pub use worker_pool::{JobOutcome, WorkerPool};
