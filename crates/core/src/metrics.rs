//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task registry (files added)
//! - Worker pool (active encoders)
//! - Encoder invocations (results, failures, duration)
//! - Batches and invariant violations

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Registry
// =============================================================================

/// Tasks created by add_files (duplicates excluded).
pub static TASKS_ADDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("flactory_tasks_added_total", "Total tasks added to the registry").unwrap()
});

/// Paths that were already registered when added again.
pub static DUPLICATES_IGNORED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "flactory_duplicate_paths_total",
        "Total source paths ignored because they were already registered",
    )
    .unwrap()
});

// =============================================================================
// Pool & encoder
// =============================================================================

/// Encoder processes currently running.
pub static ACTIVE_ENCODERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "flactory_active_encoders",
        "Number of encoder processes currently running",
    )
    .unwrap()
});

/// Tasks that reached a terminal state, by result.
pub static TASKS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("flactory_tasks_finished_total", "Total tasks finished"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Encoder failures by kind.
pub static ENCODER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("flactory_encoder_failures_total", "Total encoder failures"),
        &["kind"], // "launch_failed", "encoding_failed"
    )
    .unwrap()
});

/// Encode duration in seconds.
pub static ENCODE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "flactory_encode_duration_seconds",
            "Wall-clock duration of one encoder invocation",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Orchestration
// =============================================================================

/// Batches started.
pub static BATCHES_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("flactory_batches_started_total", "Total batches started").unwrap()
});

/// Batches in which every task reached a terminal state.
pub static BATCHES_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("flactory_batches_completed_total", "Total batches completed").unwrap()
});

/// Rejected task state transitions. Should stay at zero.
pub static INVARIANT_VIOLATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "flactory_invariant_violations_total",
        "Task state transitions rejected by the registry",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TASKS_ADDED.clone()),
        Box::new(DUPLICATES_IGNORED.clone()),
        Box::new(ACTIVE_ENCODERS.clone()),
        Box::new(TASKS_FINISHED.clone()),
        Box::new(ENCODER_FAILURES.clone()),
        Box::new(ENCODE_DURATION.clone()),
        Box::new(BATCHES_STARTED.clone()),
        Box::new(BATCHES_COMPLETED.clone()),
        Box::new(INVARIANT_VIOLATIONS.clone()),
    ]
}
