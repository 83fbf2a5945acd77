//! Ordered, deduplicated task storage.

use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::types::{ConversionTask, TaskCounts, TaskId, TaskStatus};

/// Errors from registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No task with this id.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Requested status does not follow Pending -> Running -> terminal.
    #[error("Invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Every task known to an orchestrator, in insertion order.
///
/// The registry itself is not synchronized; the orchestrator keeps it behind a
/// single lock so that mutations are serialized and reads see whole snapshots.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<ConversionTask>,
    by_source: HashMap<PathBuf, usize>,
    next_id: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending task for `source_path` unless one already exists.
    ///
    /// Returns the task id and whether a new task was created.
    pub fn add(&mut self, source_path: impl Into<PathBuf>) -> (TaskId, bool) {
        let source_path = source_path.into();
        if let Some(&index) = self.by_source.get(&source_path) {
            return (self.tasks[index].id, false);
        }

        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.by_source.insert(source_path.clone(), self.tasks.len());
        self.tasks.push(ConversionTask::new(id, source_path));
        (id, true)
    }

    /// Snapshot of every task in insertion order.
    pub fn list(&self) -> Vec<ConversionTask> {
        self.tasks.clone()
    }

    pub fn get(&self, id: TaskId) -> Option<&ConversionTask> {
        self.index_of(id).map(|i| &self.tasks[i])
    }

    pub fn find_by_source(&self, source_path: &Path) -> Option<&ConversionTask> {
        self.by_source.get(source_path).map(|&i| &self.tasks[i])
    }

    /// Ids of tasks still waiting to run, in insertion order.
    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| t.id)
            .collect()
    }

    /// Moves a task to `status`, returning the updated snapshot.
    ///
    /// Reaching a terminal state sets progress to 100; `message` is kept as the
    /// task's human-readable cause.
    pub fn set_status(
        &mut self,
        id: TaskId,
        status: TaskStatus,
        message: Option<String>,
    ) -> Result<ConversionTask, RegistryError> {
        let index = self.index_of(id).ok_or(RegistryError::TaskNotFound(id))?;
        let task = &mut self.tasks[index];

        if !task.status.can_transition_to(status) {
            return Err(RegistryError::InvalidTransition {
                id,
                from: task.status,
                to: status,
            });
        }

        let now = Utc::now();
        task.status = status;
        match status {
            TaskStatus::Running => task.started_at = Some(now),
            TaskStatus::Completed | TaskStatus::Failed => {
                task.finished_at = Some(now);
                task.progress_percent = 100;
            }
            TaskStatus::Pending => {}
        }
        if message.is_some() {
            task.message = message;
        }

        Ok(task.clone())
    }

    /// Full-scan tally of task states.
    pub fn counts(&self) -> TaskCounts {
        self.tasks.iter().fold(TaskCounts::default(), |mut acc, t| {
            acc.record(t.status);
            acc
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    // Ids are dense and never removed, so the id doubles as a 1-based index.
    fn index_of(&self, id: TaskId) -> Option<usize> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        (index < self.tasks.len()).then_some(index)
    }
}
