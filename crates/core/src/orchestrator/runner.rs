//! Orchestrator implementation.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::encoder::{EncodeJob, Encoder};
use crate::events::{notification_channel, EventStream, NotificationChannel, OrchestratorEvent};
use crate::metrics;
use crate::pool::{PoolStatus, WorkerPool};
use crate::task::{ConversionTask, RegistryError, TaskCounts, TaskId, TaskRegistry, TaskStatus};

use super::types::{AddedFile, BatchHandle, OrchestratorError};

/// Accounting for the batch currently in flight.
#[derive(Debug)]
struct BatchProgress {
    id: Uuid,
    total: usize,
    remaining: usize,
    completed: usize,
    failed: usize,
    started_at: Instant,
}

/// Everything guarded by the orchestrator's single lock.
///
/// Events are emitted while the write guard is held, so the stream order
/// always matches the order of registry mutations.
struct State {
    registry: TaskRegistry,
    batch: Option<BatchProgress>,
    events: Option<NotificationChannel>,
    closed: bool,
}

impl State {
    fn emit(&self, event: OrchestratorEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    fn emit_aggregate(&self) -> TaskCounts {
        let counts = self.registry.counts();
        self.emit(OrchestratorEvent::AggregateChanged {
            completed: counts.finished(),
            total: counts.total,
        });
        counts
    }

    /// Applies a state change and publishes the task snapshot and new totals.
    fn apply(
        &mut self,
        id: TaskId,
        status: TaskStatus,
        message: Option<String>,
    ) -> Result<ConversionTask, RegistryError> {
        let task = self.registry.set_status(id, status, message).map_err(|e| {
            metrics::INVARIANT_VIOLATIONS.inc();
            error!("Rejected task state change: {}", e);
            e
        })?;
        self.emit(OrchestratorEvent::TaskChanged { task: task.clone() });
        self.emit_aggregate();
        Ok(task)
    }

    /// Counts one finished task against the current batch.
    ///
    /// Returns true if that was the batch's last task, in which case
    /// `BatchComplete` has been emitted and the batch slot is free again.
    fn settle(&mut self, succeeded: bool) -> bool {
        let Some(batch) = self.batch.as_mut() else {
            return false;
        };
        batch.remaining = batch.remaining.saturating_sub(1);
        if succeeded {
            batch.completed += 1;
        } else {
            batch.failed += 1;
        }
        if batch.remaining > 0 {
            return false;
        }

        let Some(batch) = self.batch.take() else {
            return false;
        };
        self.emit(OrchestratorEvent::BatchComplete {
            batch_id: batch.id,
            completed: batch.completed,
            failed: batch.failed,
            total: batch.total,
        });
        metrics::BATCHES_COMPLETED.inc();
        info!(
            batch_id = %batch.id,
            completed = batch.completed,
            failed = batch.failed,
            elapsed_ms = batch.started_at.elapsed().as_millis() as u64,
            "Batch complete"
        );
        true
    }
}

struct Shared {
    state: RwLock<State>,
    batch_done: Notify,
}

impl Shared {
    /// Marks a task running. On failure the task is settled as failed so the
    /// batch can still finish.
    async fn start(&self, id: TaskId) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().await;
        match state.apply(id, TaskStatus::Running, None) {
            Ok(_) => Ok(()),
            Err(e) => {
                let finished = state.settle(false);
                drop(state);
                if finished {
                    self.batch_done.notify_waiters();
                }
                Err(e.into())
            }
        }
    }

    /// Records a terminal state and settles the task against its batch.
    async fn finish(
        &self,
        id: TaskId,
        status: TaskStatus,
        message: Option<String>,
    ) -> Result<(), OrchestratorError> {
        let mut state = self.state.write().await;
        let applied = state.apply(id, status, message);
        let finished = state.settle(applied.is_ok() && status == TaskStatus::Completed);
        drop(state);

        if finished {
            self.batch_done.notify_waiters();
        }
        applied.map(|_| ()).map_err(Into::into)
    }
}

/// Batch conversion orchestrator.
///
/// Constructed explicitly and owned by whatever drives the presentation layer;
/// there is no process-wide state. Cheap operations (`add_files`, `list`,
/// `counts`) only take the registry lock; encoding happens on the worker pool.
pub struct Orchestrator<E: Encoder + 'static> {
    encoder: Arc<E>,
    pool: WorkerPool,
    shared: Arc<Shared>,
}

impl<E: Encoder + 'static> Orchestrator<E> {
    /// Creates an orchestrator sized from `config.pool`.
    ///
    /// Returns the event stream the observer should drain.
    pub fn new(config: &Config, encoder: E) -> (Self, EventStream) {
        Self::with_pool(WorkerPool::new(config.pool.worker_count()), encoder)
    }

    /// Creates an orchestrator on an existing pool.
    pub fn with_pool(pool: WorkerPool, encoder: E) -> (Self, EventStream) {
        let (events, stream) = notification_channel();
        let shared = Arc::new(Shared {
            state: RwLock::new(State {
                registry: TaskRegistry::new(),
                batch: None,
                events: Some(events),
                closed: false,
            }),
            batch_done: Notify::new(),
        });

        info!(
            encoder = encoder.name(),
            workers = pool.size(),
            "Orchestrator created"
        );

        (
            Self {
                encoder: Arc::new(encoder),
                pool,
                shared,
            },
            stream,
        )
    }

    /// Registers source files, skipping paths that are already known.
    ///
    /// Relative paths are resolved against the current directory first. Each new
    /// task is announced with `TaskChanged`, followed by one `AggregateChanged`
    /// if anything was added.
    pub async fn add_files<I, P>(&self, paths: I) -> Vec<AddedFile>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut state = self.shared.state.write().await;
        let mut added = Vec::new();
        let mut created_any = false;

        for path in paths {
            let source_path = absolute_path(path.as_ref());
            let (task_id, created) = state.registry.add(source_path.clone());

            if created {
                created_any = true;
                metrics::TASKS_ADDED.inc();
                let task = state.registry.get(task_id).cloned();
                if let Some(task) = task {
                    debug!(task = %task_id, source = ?task.source_path, "Task added");
                    state.emit(OrchestratorEvent::TaskChanged { task });
                }
            } else {
                metrics::DUPLICATES_IGNORED.inc();
                debug!(task = %task_id, source = ?source_path, "Path already registered");
            }

            added.push(AddedFile {
                task_id,
                source_path,
                already_existed: !created,
            });
        }

        if created_any {
            state.emit_aggregate();
        }
        added
    }

    /// Starts converting every pending task as one batch.
    ///
    /// Returns as soon as the tasks are queued on the pool.
    pub async fn convert_all(&self) -> Result<BatchHandle, OrchestratorError> {
        let mut state = self.shared.state.write().await;

        if state.closed {
            return Err(OrchestratorError::ShutDown);
        }
        if state.registry.is_empty() {
            return Err(OrchestratorError::NoFiles);
        }
        if let Some(batch) = &state.batch {
            return Err(OrchestratorError::BatchInProgress(batch.id));
        }

        let task_ids = state.registry.pending_ids();
        if task_ids.is_empty() {
            return Err(OrchestratorError::NothingPending);
        }

        let batch_id = Uuid::new_v4();
        let jobs: Vec<EncodeJob> = task_ids
            .iter()
            .filter_map(|&id| state.registry.get(id).map(EncodeJob::from))
            .collect();

        state.batch = Some(BatchProgress {
            id: batch_id,
            total: jobs.len(),
            remaining: jobs.len(),
            completed: 0,
            failed: 0,
            started_at: Instant::now(),
        });
        metrics::BATCHES_STARTED.inc();
        info!(
            %batch_id,
            tasks = jobs.len(),
            workers = self.pool.size(),
            "Starting batch"
        );

        let workers = jobs
            .into_iter()
            .map(|job| {
                let shared = Arc::clone(&self.shared);
                let encoder = Arc::clone(&self.encoder);
                self.pool.submit(run_task(shared, encoder, job))
            })
            .collect();

        Ok(BatchHandle::new(batch_id, task_ids, workers))
    }

    /// Snapshot of all tasks in insertion order.
    pub async fn list(&self) -> Vec<ConversionTask> {
        self.shared.state.read().await.registry.list()
    }

    pub async fn get(&self, id: TaskId) -> Option<ConversionTask> {
        self.shared.state.read().await.registry.get(id).cloned()
    }

    /// Current aggregate tallies.
    pub async fn counts(&self) -> TaskCounts {
        self.shared.state.read().await.registry.counts()
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Whether a batch is currently in flight.
    pub async fn is_busy(&self) -> bool {
        self.shared.state.read().await.batch.is_some()
    }

    /// Waits until no batch is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.batch_done.notified();
            if !self.is_busy().await {
                return;
            }
            notified.await;
        }
    }

    /// Stops accepting batches, waits for the running one, then closes the
    /// event stream so the observer's delivery loop can end.
    pub async fn shutdown(&self) {
        self.shared.state.write().await.closed = true;
        self.wait_idle().await;

        let counts = {
            let mut state = self.shared.state.write().await;
            state.events = None;
            state.registry.counts()
        };
        info!(
            total = counts.total,
            completed = counts.completed,
            failed = counts.failed,
            "Orchestrator shut down"
        );
    }
}

/// Per-task worker body: Running, encode, terminal state.
async fn run_task<E: Encoder + 'static>(
    shared: Arc<Shared>,
    encoder: Arc<E>,
    job: EncodeJob,
) -> Result<TaskStatus, OrchestratorError> {
    let task_id = job.task_id;
    shared.start(task_id).await?;
    debug!(task = %task_id, source = ?job.source_path, "Encoding");

    let started = Instant::now();
    let outcome = AssertUnwindSafe(encoder.encode(&job)).catch_unwind().await;
    let elapsed = started.elapsed().as_secs_f64();

    let (status, message) = match outcome {
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(task = %task_id, source = ?job.source_path, "Encoder panicked: {}", reason);
            metrics::ENCODER_FAILURES.with_label_values(&["panicked"]).inc();
            (TaskStatus::Failed, Some(format!("Encoder panicked: {}", reason)))
        }
        Ok(Ok(report)) => {
            debug!(
                task = %task_id,
                duration_ms = report.duration_ms,
                output_size_bytes = ?report.output_size_bytes,
                "Encoded"
            );
            (TaskStatus::Completed, None)
        }
        Ok(Err(e)) => {
            warn!(task = %task_id, source = ?job.source_path, "Encoding failed: {}", e);
            metrics::ENCODER_FAILURES.with_label_values(&[e.kind()]).inc();
            (TaskStatus::Failed, Some(e.user_message()))
        }
    };

    metrics::TASKS_FINISHED
        .with_label_values(&[status.as_str()])
        .inc();
    metrics::ENCODE_DURATION
        .with_label_values(&[status.as_str()])
        .observe(elapsed);

    shared.finish(task_id, status, message).await?;
    Ok(status)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncodeReport, EncoderError};
    use crate::testing::{MockEncoder, MockOutcome};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Panics while encoding any file named `boom.wav`.
    struct PanickingEncoder;

    #[async_trait]
    impl Encoder for PanickingEncoder {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn encode(&self, job: &EncodeJob) -> Result<EncodeReport, EncoderError> {
            if job.source_path.ends_with("boom.wav") {
                panic!("decoder state corrupted");
            }
            Ok(EncodeReport {
                task_id: job.task_id,
                duration_ms: 0,
                output_size_bytes: None,
            })
        }

        async fn validate(&self) -> Result<(), EncoderError> {
            Ok(())
        }
    }

    fn orchestrator(workers: usize) -> (Orchestrator<MockEncoder>, EventStream, MockEncoder) {
        let encoder = MockEncoder::new();
        let (orchestrator, events) =
            Orchestrator::with_pool(WorkerPool::new(workers), encoder.clone());
        (orchestrator, events, encoder)
    }

    #[tokio::test]
    async fn test_add_files_deduplicates() {
        let (orch, mut events, _) = orchestrator(2);

        let added = orch.add_files(["/m/a.wav", "/m/b.wav", "/m/a.wav"]).await;
        assert_eq!(added.len(), 3);
        assert!(!added[0].already_existed);
        assert!(!added[1].already_existed);
        assert!(added[2].already_existed);
        assert_eq!(added[2].task_id, added[0].task_id);

        let tasks = orch.list().await;
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Pending));

        // Two TaskChanged then one AggregateChanged
        let queued: Vec<_> = events.drain().into_iter().map(|e| e.event).collect();
        assert_eq!(queued.len(), 3);
        assert!(matches!(
            queued[2],
            OrchestratorEvent::AggregateChanged {
                completed: 0,
                total: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_add_only_duplicates_emits_nothing() {
        let (orch, mut events, _) = orchestrator(1);
        orch.add_files(["/m/a.wav"]).await;
        events.drain();

        orch.add_files(["/m/a.wav"]).await;
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_relative_paths_are_made_absolute() {
        let (orch, _events, _) = orchestrator(1);
        let added = orch.add_files(["a.wav", "./a.wav"]).await;

        assert!(added[0].source_path.is_absolute());
        assert_eq!(orch.list().await.len(), 1);
        assert!(added[1].already_existed);
    }

    #[tokio::test]
    async fn test_convert_all_empty_registry() {
        let (orch, _events, _) = orchestrator(1);
        let err = orch.convert_all().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NoFiles));
    }

    #[tokio::test]
    async fn test_convert_all_runs_every_task() {
        let (orch, _events, encoder) = orchestrator(2);
        encoder.set_outcome("b.wav", MockOutcome::ExitCode(1)).await;
        orch.add_files(["/m/a.wav", "/m/b.wav", "/m/c.wav"]).await;

        let batch = orch.convert_all().await.unwrap();
        assert_eq!(batch.len(), 3);
        let summary = batch.wait().await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);

        let counts = orch.counts().await;
        assert!(counts.is_complete());
        assert_eq!(counts.failed, 1);

        let failed = orch.get(TaskId(2)).await.unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.progress_percent, 100);
        assert!(failed.message.unwrap().contains("code 1"));
    }

    #[tokio::test]
    async fn test_second_run_only_converts_new_files() {
        let (orch, _events, encoder) = orchestrator(2);
        orch.add_files(["/m/a.wav"]).await;
        orch.convert_all().await.unwrap().wait().await.unwrap();

        let err = orch.convert_all().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NothingPending));

        orch.add_files(["/m/a.wav", "/m/b.wav"]).await;
        let batch = orch.convert_all().await.unwrap();
        assert_eq!(batch.task_ids(), &[TaskId(2)]);
        batch.wait().await.unwrap();

        let sources: Vec<_> = encoder
            .recorded_jobs()
            .await
            .into_iter()
            .map(|j| j.source_path)
            .collect();
        assert_eq!(sources, vec![PathBuf::from("/m/a.wav"), PathBuf::from("/m/b.wav")]);
    }

    #[tokio::test]
    async fn test_batch_in_progress_is_rejected() {
        let (orch, _events, encoder) = orchestrator(1);
        encoder.set_encode_duration(Duration::from_millis(100)).await;
        orch.add_files(["/m/a.wav"]).await;

        let batch = orch.convert_all().await.unwrap();
        assert!(orch.is_busy().await);
        orch.add_files(["/m/b.wav"]).await;
        let err = orch.convert_all().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::BatchInProgress(id) if id == batch.batch_id()));

        batch.wait().await.unwrap();
        orch.wait_idle().await;
        assert!(!orch.is_busy().await);
    }

    #[tokio::test]
    async fn test_shutdown_closes_stream_and_rejects_batches() {
        let (orch, mut events, _) = orchestrator(2);
        orch.add_files(["/m/a.wav", "/m/b.wav"]).await;
        let _batch = orch.convert_all().await.unwrap();

        orch.shutdown().await;
        assert!(orch.counts().await.is_complete());

        let mut last = None;
        while let Some(envelope) = events.recv().await {
            last = Some(envelope.event);
        }
        assert!(matches!(last, Some(OrchestratorEvent::BatchComplete { total: 2, .. })));

        orch.add_files(["/m/c.wav"]).await;
        assert!(matches!(
            orch.convert_all().await,
            Err(OrchestratorError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_pool_status_after_batch() {
        let (orch, _events, encoder) = orchestrator(3);
        encoder.set_outcome("c.wav", MockOutcome::ExitCode(1)).await;
        orch.add_files(["/m/a.wav", "/m/b.wav", "/m/c.wav"]).await;
        orch.convert_all().await.unwrap().wait().await.unwrap();

        let status = orch.pool_status();
        assert_eq!(status.size, 3);
        assert_eq!(status.total_processed, 3);
        assert_eq!(status.total_failed, 1);
        assert_eq!(status.active_jobs, 0);
    }

    #[tokio::test]
    async fn test_encoder_panic_fails_task_and_settles_batch() {
        let (orch, mut events) = Orchestrator::with_pool(WorkerPool::new(1), PanickingEncoder);
        orch.add_files(["/m/boom.wav", "/m/ok.wav"]).await;

        let summary = orch.convert_all().await.unwrap().wait().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 1);

        let boom = orch.get(TaskId(1)).await.unwrap();
        assert_eq!(boom.status, TaskStatus::Failed);
        assert!(boom
            .message
            .unwrap()
            .contains("Encoder panicked: decoder state corrupted"));
        assert!(!orch.is_busy().await);
        assert_eq!(orch.pool_status().active_jobs, 0);

        assert!(matches!(
            orch.convert_all().await,
            Err(OrchestratorError::NothingPending)
        ));
        tokio::time::timeout(Duration::from_secs(2), orch.shutdown())
            .await
            .expect("Shutdown did not finish");

        let mut batches = 0;
        while let Some(envelope) = events.recv().await {
            if matches!(envelope.event, OrchestratorEvent::BatchComplete { .. }) {
                batches += 1;
            }
        }
        assert_eq!(batches, 1);
    }
}
