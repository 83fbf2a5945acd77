use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::{EventEnvelope, OrchestratorEvent};

/// Create a connected sender/receiver pair.
pub fn notification_channel() -> (NotificationChannel, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        NotificationChannel {
            tx,
            sequence: Arc::new(AtomicU64::new(0)),
        },
        EventStream { rx },
    )
}

/// Sending half, owned by the orchestrator.
///
/// Sends never block. Callers that need ordering (the orchestrator) emit while
/// holding the registry lock.
#[derive(Clone)]
pub struct NotificationChannel {
    tx: mpsc::UnboundedSender<EventEnvelope>,
    sequence: Arc<AtomicU64>,
}

impl NotificationChannel {
    /// Enqueue an event for the observer.
    ///
    /// Returns false if the observer has dropped its stream; the event is lost
    /// and a warning is logged, but the caller carries on.
    pub fn emit(&self, event: OrchestratorEvent) -> bool {
        let envelope = EventEnvelope {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: Utc::now(),
            event,
        };
        match self.tx.send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    event = e.0.event.event_type(),
                    "Observer stream closed, dropping event"
                );
                false
            }
        }
    }

    /// Number of events emitted so far.
    pub fn emitted(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the presentation layer.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<EventEnvelope>,
}

impl EventStream {
    /// Waits for the next event; `None` once the orchestrator is gone.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<EventEnvelope> {
        self.rx.try_recv().ok()
    }

    /// Drains every queued event without waiting.
    pub fn drain(&mut self) -> Vec<EventEnvelope> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
