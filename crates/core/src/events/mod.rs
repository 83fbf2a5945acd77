//! Notifications from the orchestrator to its observer.
//!
//! The orchestrator pushes [`OrchestratorEvent`]s into a [`NotificationChannel`].
//! The presentation layer owns the matching [`EventStream`] and drains it one
//! event at a time, either directly or through an [`EventDispatcher`] that calls
//! a [`TaskObserver`]. Events are enqueued while the registry lock is held, so
//! the stream order is the order in which state actually changed.

mod channel;
mod dispatcher;
mod types;

pub use channel::{notification_channel, EventStream, NotificationChannel};
pub use dispatcher::{EventDispatcher, TaskObserver};
pub use types::{EventEnvelope, OrchestratorEvent};
