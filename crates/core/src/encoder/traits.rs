//! Trait definitions for the encoder module.

use async_trait::async_trait;

use super::error::EncoderError;
use super::types::{EncodeJob, EncodeReport};

/// Something that turns one source file into one FLAC file.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Encodes `job.source_path` into `job.destination_path`.
    ///
    /// Resolves once the encoder has finished; `Ok` means exit code 0.
    async fn encode(&self, job: &EncodeJob) -> Result<EncodeReport, EncoderError>;

    /// Checks that the encoder can be launched at all.
    async fn validate(&self) -> Result<(), EncoderError>;
}
