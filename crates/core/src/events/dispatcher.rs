use uuid::Uuid;

use super::channel::EventStream;
use super::types::{EventEnvelope, OrchestratorEvent};
use crate::task::ConversionTask;

/// Receives orchestrator events, one at a time, on the dispatcher's task.
///
/// Methods take `&mut self`: the dispatcher never calls an observer
/// concurrently, so implementations need no locking of their own.
pub trait TaskObserver: Send {
    fn on_task_changed(&mut self, task: &ConversionTask);

    fn on_aggregate_changed(&mut self, completed: usize, total: usize);

    fn on_batch_complete(
        &mut self,
        _batch_id: Uuid,
        _completed: usize,
        _failed: usize,
        _total: usize,
    ) {
    }
}

/// Delivery loop that drains an [`EventStream`] into a [`TaskObserver`].
pub struct EventDispatcher<O: TaskObserver> {
    stream: EventStream,
    observer: O,
}

impl<O: TaskObserver> EventDispatcher<O> {
    pub fn new(stream: EventStream, observer: O) -> Self {
        Self { stream, observer }
    }

    /// Run the dispatcher until the orchestrator shuts down.
    ///
    /// Spawn this as a background task; the observer is handed back once the
    /// stream closes.
    pub async fn run(mut self) -> O {
        tracing::debug!("Event dispatcher started");

        let mut delivered = 0u64;
        while let Some(envelope) = self.stream.recv().await {
            Self::deliver(&mut self.observer, &envelope);
            delivered += 1;
        }

        tracing::debug!(delivered, "Event dispatcher shutting down");
        self.observer
    }

    fn deliver(observer: &mut O, envelope: &EventEnvelope) {
        match &envelope.event {
            OrchestratorEvent::TaskChanged { task } => observer.on_task_changed(task),
            OrchestratorEvent::AggregateChanged { completed, total } => {
                observer.on_aggregate_changed(*completed, *total)
            }
            OrchestratorEvent::BatchComplete {
                batch_id,
                completed,
                failed,
                total,
            } => observer.on_batch_complete(*batch_id, *completed, *failed, *total),
        }
    }
}
