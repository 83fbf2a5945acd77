//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable encoder and an observer that records
//! everything it is told, so orchestration can be tested without a real
//! `flac` binary or a UI.
//!
//! # Example
//!
//! ```rust,ignore
//! use flactory_core::testing::{MockEncoder, MockOutcome, RecordingObserver};
//!
//! let encoder = MockEncoder::new();
//! encoder.set_outcome("b.wav", MockOutcome::ExitCode(1)).await;
//!
//! let (orchestrator, events) = Orchestrator::with_pool(WorkerPool::new(2), encoder.clone());
//! let dispatcher = tokio::spawn(EventDispatcher::new(events, RecordingObserver::default()).run());
//! ```

mod mock_encoder;
mod recording_observer;

pub use mock_encoder::{MockEncoder, MockOutcome};
pub use recording_observer::{ObservedBatch, RecordingObserver};
