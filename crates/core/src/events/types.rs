use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::ConversionTask;

/// Something the observer should render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// A task was added or changed status. Carries a full snapshot.
    TaskChanged { task: ConversionTask },
    /// Finished (completed or failed) tasks over all tasks in the registry.
    AggregateChanged { completed: usize, total: usize },
    /// Every task of a batch reached a terminal state. Sent once per batch.
    BatchComplete {
        batch_id: Uuid,
        completed: usize,
        failed: usize,
        total: usize,
    },
}

impl OrchestratorEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrchestratorEvent::TaskChanged { .. } => "task_changed",
            OrchestratorEvent::AggregateChanged { .. } => "aggregate_changed",
            OrchestratorEvent::BatchComplete { .. } => "batch_complete",
        }
    }
}

/// Envelope wrapping an event with delivery metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Position in the stream, starting at 1 with no gaps.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: OrchestratorEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_serialization() {
        let event = OrchestratorEvent::AggregateChanged {
            completed: 2,
            total: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "aggregate_changed");
        assert_eq!(json["completed"], 2);
        assert_eq!(json["total"], 5);
    }

    #[test]
    fn test_envelope_flattens_event() {
        let envelope = EventEnvelope {
            sequence: 3,
            timestamp: Utc::now(),
            event: OrchestratorEvent::BatchComplete {
                batch_id: Uuid::nil(),
                completed: 1,
                failed: 1,
                total: 2,
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["type"], "batch_complete");
        assert_eq!(json["failed"], 1);

        let parsed: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.event, envelope.event);
    }
}
