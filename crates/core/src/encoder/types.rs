//! Types for the encoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::task::{ConversionTask, TaskId};

/// A single encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeJob {
    pub task_id: TaskId,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

impl EncodeJob {
    pub fn new(
        task_id: TaskId,
        source_path: impl Into<PathBuf>,
        destination_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            task_id,
            source_path: source_path.into(),
            destination_path: destination_path.into(),
        }
    }
}

impl From<&ConversionTask> for EncodeJob {
    fn from(task: &ConversionTask) -> Self {
        Self::new(task.id, &task.source_path, &task.destination_path)
    }
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeReport {
    pub task_id: TaskId,
    /// Wall-clock time the encoder ran.
    pub duration_ms: u64,
    /// Size of the written file, when it could be read back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_size_bytes: Option<u64>,
}
