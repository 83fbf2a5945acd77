//! Conversion tasks and the registry that owns them.
//!
//! A [`ConversionTask`] is one source file headed for one `.flac` destination.
//! The [`TaskRegistry`] keeps tasks in insertion order, deduplicates them by
//! source path and enforces the task state machine:
//!
//! ```text
//! Pending -> Running -> Completed
//!                    \-> Failed
//! ```

mod naming;
mod registry;
mod types;

pub use naming::{destination_path_for, TARGET_EXTENSION};
pub use registry::{RegistryError, TaskRegistry};
pub use types::{ConversionTask, TaskCounts, TaskId, TaskStatus};
