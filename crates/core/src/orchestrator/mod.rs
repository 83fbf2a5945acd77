//! Batch orchestrator.
//!
//! Owns the task registry, the worker pool and the encoder, and drives every
//! pending task through `Pending -> Running -> Completed | Failed`:
//!
//! 1. `add_files` registers deduplicated tasks in `Pending`.
//! 2. `convert_all` claims every pending task as one batch and submits each to
//!    the worker pool.
//! 3. A worker that gets a slot marks its task `Running`, runs the encoder and
//!    records the terminal state.
//! 4. After each change the aggregate counts are recomputed and published; the
//!    worker that finishes a batch's last task publishes `BatchComplete`.
//!
//! # Example
//!
//! ```ignore
//! use flactory_core::{Config, FlacEncoder, Orchestrator};
//!
//! let config = Config::default();
//! let encoder = FlacEncoder::new(config.encoder.clone());
//! let (orchestrator, mut events) = Orchestrator::new(&config, encoder);
//!
//! orchestrator.add_files(["/music/a.wav", "/music/b.wav"]).await;
//! let batch = orchestrator.convert_all().await?;
//!
//! tokio::spawn(async move {
//!     while let Some(envelope) = events.recv().await {
//!         println!("{:?}", envelope.event);
//!     }
//! });
//!
//! let summary = batch.wait().await?;
//! orchestrator.shutdown().await;
//! ```

mod runner;
mod types;

pub use runner::Orchestrator;
pub use types::{AddedFile, BatchHandle, BatchSummary, OrchestratorError};
