//! Types for the orchestrator module.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::task::{RegistryError, TaskId, TaskStatus};

/// Errors returned by orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// `convert_all` was called before any file was added.
    #[error("No files to convert")]
    NoFiles,

    /// Every registered task has already reached a terminal state.
    #[error("No pending files to convert")]
    NothingPending,

    /// A previous batch has not finished yet.
    #[error("Batch {0} is still running")]
    BatchInProgress(Uuid),

    /// The orchestrator has been shut down.
    #[error("Orchestrator is shut down")]
    ShutDown,

    /// The registry rejected a state change. Indicates a bug.
    #[error("Task state invariant violated: {0}")]
    Registry(#[from] RegistryError),

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Result of adding one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedFile {
    pub task_id: TaskId,
    /// Path as registered (absolute).
    pub source_path: PathBuf,
    /// True if the path was already registered; no task was created.
    pub already_existed: bool,
}

/// Final tallies of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.completed == self.total
    }
}

/// Handle to a running batch.
///
/// Dropping the handle does not cancel anything; the workers keep running and
/// the orchestrator still reports their progress.
#[derive(Debug)]
pub struct BatchHandle {
    batch_id: Uuid,
    task_ids: Vec<TaskId>,
    workers: Vec<JoinHandle<Result<TaskStatus, OrchestratorError>>>,
    started: Instant,
}

impl BatchHandle {
    pub(crate) fn new(
        batch_id: Uuid,
        task_ids: Vec<TaskId>,
        workers: Vec<JoinHandle<Result<TaskStatus, OrchestratorError>>>,
    ) -> Self {
        Self {
            batch_id,
            task_ids,
            workers,
            started: Instant::now(),
        }
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Tasks claimed by this batch, in registry order.
    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }

    /// Waits for every worker of the batch.
    ///
    /// Individual task failures are part of the summary. An error is returned
    /// only if a worker broke an invariant or panicked; the remaining workers
    /// are still awaited first.
    pub async fn wait(self) -> Result<BatchSummary, OrchestratorError> {
        let total = self.task_ids.len();
        let mut completed = 0;
        let mut failed = 0;
        let mut first_error = None;

        for joined in join_all(self.workers).await {
            let outcome = joined.map_err(|e| OrchestratorError::Worker(e.to_string()));
            match outcome.and_then(|r| r) {
                Ok(TaskStatus::Completed) => completed += 1,
                Ok(_) => failed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(batch_id = %self.batch_id, "Batch worker error: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        Ok(BatchSummary {
            batch_id: self.batch_id,
            total,
            completed,
            failed,
            duration_ms: self.started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_all_succeeded() {
        let summary = BatchSummary {
            batch_id: Uuid::nil(),
            total: 2,
            completed: 2,
            failed: 0,
            duration_ms: 5,
        };
        assert!(summary.all_succeeded());

        let summary = BatchSummary {
            failed: 1,
            completed: 1,
            ..summary
        };
        assert!(!summary.all_succeeded());
    }

    #[tokio::test]
    async fn test_wait_collects_worker_results() {
        let workers = vec![
            tokio::spawn(async { Ok(TaskStatus::Completed) }),
            tokio::spawn(async { Ok(TaskStatus::Failed) }),
            tokio::spawn(async { Ok(TaskStatus::Completed) }),
        ];
        let handle = BatchHandle::new(
            Uuid::new_v4(),
            vec![TaskId(1), TaskId(2), TaskId(3)],
            workers,
        );
        assert_eq!(handle.len(), 3);

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_wait_surfaces_worker_error() {
        let workers = vec![
            tokio::spawn(async { Ok(TaskStatus::Completed) }),
            tokio::spawn(async {
                Err(OrchestratorError::Registry(RegistryError::TaskNotFound(
                    TaskId(2),
                )))
            }),
        ];
        let handle = BatchHandle::new(Uuid::new_v4(), vec![TaskId(1), TaskId(2)], workers);

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Registry(_)));
    }
}
