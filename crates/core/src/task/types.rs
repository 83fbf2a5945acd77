//! Types for the task module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::naming::destination_path_for;

/// Stable task identifier, assigned in insertion order starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Status of a conversion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Added, waiting for a batch to pick it up.
    Pending,
    /// Encoder process is running for this task.
    Running,
    /// Encoder exited with code 0 (terminal).
    Completed,
    /// Encoder could not be launched or exited non-zero (terminal).
    Failed,
}

impl TaskStatus {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether `next` is the legal successor of this status.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source file's conversion.
///
/// Instances handed out by the registry are snapshots; mutating them has no
/// effect on the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionTask {
    pub id: TaskId,
    /// Absolute path of the input file.
    pub source_path: PathBuf,
    /// Output path, derived once from `source_path`.
    pub destination_path: PathBuf,
    pub status: TaskStatus,
    /// 0 until the task is terminal, then 100 (also on failure).
    pub progress_percent: u8,
    /// Failure cause, set when the task fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConversionTask {
    pub(crate) fn new(id: TaskId, source_path: PathBuf) -> Self {
        let destination_path = destination_path_for(&source_path);
        Self {
            id,
            source_path,
            destination_path,
            status: TaskStatus::Pending,
            progress_percent: 0,
            message: None,
            added_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// File name of the source, for display.
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// Milliseconds spent between dispatch and the terminal state.
    pub fn elapsed_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }
}

/// Tallies over every task in the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskCounts {
    /// Tasks in a terminal state, successful or not.
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    /// Whole-number share of finished tasks; 0 for an empty registry.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            (self.finished() * 100 / self.total) as u8
        }
    }

    /// True when there is at least one task and none is left to run.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.finished() == self.total
    }

    pub(crate) fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Running => self.running += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Running));
        for terminal in [TaskStatus::Completed, TaskStatus::Failed] {
            for next in [
                TaskStatus::Pending,
                TaskStatus::Running,
                TaskStatus::Completed,
                TaskStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = ConversionTask::new(TaskId(1), PathBuf::from("/music/a.wav"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress_percent, 0);
        assert_eq!(task.destination_path, PathBuf::from("/music/a.flac"));
        assert_eq!(task.file_name(), "a.wav");
        assert!(task.elapsed_ms().is_none());
    }

    #[test]
    fn test_counts_percent() {
        let mut counts = TaskCounts::default();
        assert_eq!(counts.percent(), 0);
        assert!(!counts.is_complete());

        counts.record(TaskStatus::Completed);
        counts.record(TaskStatus::Failed);
        counts.record(TaskStatus::Running);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.finished(), 2);
        assert_eq!(counts.percent(), 66);
        assert!(!counts.is_complete());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(TaskId(7).to_string(), "#7");
    }
}
