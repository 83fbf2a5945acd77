//! Observer that records every notification for assertions.

use std::collections::HashSet;
use uuid::Uuid;

use crate::events::TaskObserver;
use crate::task::{ConversionTask, TaskId, TaskStatus};

/// One completed batch as seen by the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedBatch {
    pub batch_id: Uuid,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

/// Records task snapshots, aggregate updates and batch completions in the
/// order they were delivered.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub tasks: Vec<ConversionTask>,
    pub aggregates: Vec<(usize, usize)>,
    pub batches: Vec<ObservedBatch>,
    running: HashSet<TaskId>,
    peak_running: usize,
}

impl RecordingObserver {
    /// Every status a task was seen in, in delivery order.
    pub fn status_history(&self, id: TaskId) -> Vec<TaskStatus> {
        self.tasks
            .iter()
            .filter(|t| t.id == id)
            .map(|t| t.status)
            .collect()
    }

    /// Latest snapshot of each task, in task-id order.
    pub fn final_tasks(&self) -> Vec<ConversionTask> {
        let mut latest: Vec<ConversionTask> = Vec::new();
        for task in &self.tasks {
            match latest.iter_mut().find(|t| t.id == task.id) {
                Some(existing) => *existing = task.clone(),
                None => latest.push(task.clone()),
            }
        }
        latest.sort_by_key(|t| t.id);
        latest
    }

    /// Most tasks observed in `Running` at the same time.
    pub fn peak_running(&self) -> usize {
        self.peak_running
    }
}

impl TaskObserver for RecordingObserver {
    fn on_task_changed(&mut self, task: &ConversionTask) {
        match task.status {
            TaskStatus::Running => {
                self.running.insert(task.id);
                self.peak_running = self.peak_running.max(self.running.len());
            }
            TaskStatus::Completed | TaskStatus::Failed => {
                self.running.remove(&task.id);
            }
            TaskStatus::Pending => {}
        }
        self.tasks.push(task.clone());
    }

    fn on_aggregate_changed(&mut self, completed: usize, total: usize) {
        self.aggregates.push((completed, total));
    }

    fn on_batch_complete(&mut self, batch_id: Uuid, completed: usize, failed: usize, total: usize) {
        self.batches.push(ObservedBatch {
            batch_id,
            completed,
            failed,
            total,
        });
    }
}
