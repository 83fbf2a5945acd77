//! Console presentation of orchestrator events.

use std::io::Write;

use flactory_core::{ConversionTask, EventStream, TaskObserver, TaskStatus};
use uuid::Uuid;

/// Prints one line per task change and a running total.
pub struct ConsoleObserver<W: Write + Send> {
    out: W,
    last_completed: Option<usize>,
}

impl<W: Write + Send> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_completed: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: String) {
        if let Err(e) = writeln!(self.out, "{}", text) {
            tracing::debug!("Failed to write to console: {}", e);
        }
    }
}

impl<W: Write + Send> TaskObserver for ConsoleObserver<W> {
    fn on_task_changed(&mut self, task: &ConversionTask) {
        let text = match (&task.status, &task.message) {
            (TaskStatus::Failed, Some(message)) => {
                format!("{:<9} {}: {}", task.status.as_str(), task.file_name(), message)
            }
            (TaskStatus::Completed, _) => format!(
                "{:<9} {} -> {}",
                task.status.as_str(),
                task.file_name(),
                task.destination_path.display()
            ),
            _ => format!("{:<9} {}", task.status.as_str(), task.file_name()),
        };
        self.line(text);
    }

    fn on_aggregate_changed(&mut self, completed: usize, total: usize) {
        // Running transitions repeat the previous total
        if completed == 0 || self.last_completed == Some(completed) {
            return;
        }
        self.last_completed = Some(completed);
        self.line(format!("Converted {} of {} files", completed, total));
    }

    fn on_batch_complete(
        &mut self,
        _batch_id: Uuid,
        _completed: usize,
        failed: usize,
        total: usize,
    ) {
        if failed > 0 {
            self.line(format!("{} of {} files failed", failed, total));
        }
        self.line("All conversions completed!".to_string());
    }
}

/// Writes every event as one JSON object per line until the stream closes.
///
/// Returns the number of events written.
pub async fn write_json_lines<W: Write>(
    mut stream: EventStream,
    mut out: W,
) -> std::io::Result<u64> {
    let mut written = 0;
    while let Some(envelope) = stream.recv().await {
        serde_json::to_writer(&mut out, &envelope)?;
        out.write_all(b"\n")?;
        out.flush()?;
        written += 1;
    }
    Ok(written)
}
