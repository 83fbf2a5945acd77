//! Encoder module: runs the external FLAC encoder for one file.
//!
//! This module provides the `Encoder` trait and `FlacEncoder`, which invokes the
//! reference `flac` command line tool once per file:
//!
//! ```text
//! flac -8 -f -o <destination> <source>
//! ```
//!
//! The call blocks (asynchronously) until the encoder exits. There is no
//! timeout and no retry; concurrency is bounded by the worker pool instead.
//!
//! # Example
//!
//! ```ignore
//! use flactory_core::encoder::{EncodeJob, Encoder, FlacEncoder};
//!
//! let encoder = FlacEncoder::with_defaults();
//! encoder.validate().await?;
//!
//! let job = EncodeJob::new(TaskId(1), "/music/a.wav", "/music/a.flac");
//! let report = encoder.encode(&job).await?;
//! println!("Encoded in {} ms", report.duration_ms);
//! ```

mod error;
mod flac;
mod traits;
mod types;

pub use error::EncoderError;
pub use flac::{FlacEncoder, FLAC_ARGS};
pub use traits::Encoder;
pub use types::{EncodeJob, EncodeReport};
