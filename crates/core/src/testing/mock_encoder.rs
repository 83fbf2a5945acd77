//! Mock encoder for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::encoder::{EncodeJob, EncodeReport, Encoder, EncoderError};

/// What the mock does for a given source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Exit code 0.
    Success,
    /// Ran, exited with this code.
    ExitCode(i32),
    /// Could not be started.
    LaunchFailure(String),
}

/// Mock implementation of the Encoder trait.
///
/// Provides controllable behavior for testing:
/// - Per-file outcomes, keyed by full path or by file name
/// - Simulated encode duration
/// - Records every job and the peak number of concurrent encodes
///
/// Clones share state, so a test can keep one clone for assertions while the
/// orchestrator owns another.
#[derive(Debug, Clone)]
pub struct MockEncoder {
    outcomes: Arc<RwLock<HashMap<PathBuf, MockOutcome>>>,
    default_outcome: Arc<RwLock<MockOutcome>>,
    encode_duration: Arc<RwLock<Duration>>,
    validate_error: Arc<RwLock<Option<EncoderError>>>,
    jobs: Arc<RwLock<Vec<EncodeJob>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl Default for MockEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEncoder {
    /// Create a mock that succeeds for everything after a short delay.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(HashMap::new())),
            default_outcome: Arc::new(RwLock::new(MockOutcome::Success)),
            encode_duration: Arc::new(RwLock::new(Duration::from_millis(10))),
            validate_error: Arc::new(RwLock::new(None)),
            jobs: Arc::new(RwLock::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the outcome for a source, given as a full path or a bare file name.
    pub async fn set_outcome(&self, source: impl AsRef<Path>, outcome: MockOutcome) {
        self.outcomes
            .write()
            .await
            .insert(source.as_ref().to_path_buf(), outcome);
    }

    /// Outcome for sources without a specific entry.
    pub async fn set_default_outcome(&self, outcome: MockOutcome) {
        *self.default_outcome.write().await = outcome;
    }

    /// Set the simulated encode duration.
    pub async fn set_encode_duration(&self, duration: Duration) {
        *self.encode_duration.write().await = duration;
    }

    /// Make `validate()` fail with the given error.
    pub async fn set_validate_error(&self, error: EncoderError) {
        *self.validate_error.write().await = Some(error);
    }

    /// Get all recorded jobs, in the order they started.
    pub async fn recorded_jobs(&self) -> Vec<EncodeJob> {
        self.jobs.read().await.clone()
    }

    /// Get the number of encodes performed.
    pub async fn encode_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Highest number of encodes that ran at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn outcome_for(&self, source: &Path) -> MockOutcome {
        let outcomes = self.outcomes.read().await;
        let by_name = source.file_name().map(PathBuf::from);
        outcomes
            .get(source)
            .or_else(|| by_name.as_ref().and_then(|n| outcomes.get(n)))
            .cloned()
            .unwrap_or(self.default_outcome.read().await.clone())
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn encode(&self, job: &EncodeJob) -> Result<EncodeReport, EncoderError> {
        self.jobs.write().await.push(job.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let outcome = self.outcome_for(&job.source_path).await;
        let duration = *self.encode_duration.read().await;
        if !matches!(outcome, MockOutcome::LaunchFailure(_)) && !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            MockOutcome::Success => Ok(EncodeReport {
                task_id: job.task_id,
                duration_ms: duration.as_millis() as u64,
                output_size_bytes: Some(1024),
            }),
            MockOutcome::ExitCode(code) => Err(EncoderError::encoding_failed(
                Some(code),
                Some(format!("mock encoder failed with {}", code)),
            )),
            MockOutcome::LaunchFailure(reason) => {
                Err(EncoderError::launch_failed("mock-flac", reason))
            }
        }
    }

    async fn validate(&self) -> Result<(), EncoderError> {
        match self.validate_error.read().await.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
