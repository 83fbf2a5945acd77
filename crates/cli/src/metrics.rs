//! Prometheus metrics for a conversion run.
//!
//! Registers the core counters together with gauges that are filled from the
//! orchestrator's final state, and renders the text exposition format.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{self, Encoder, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use flactory_core::{PoolStatus, TaskCounts};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Tasks per status at collection time.
pub static TASKS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("flactory_tasks", "Number of tasks in each status"),
        &["status"],
    )
    .unwrap()
});

/// Configured worker pool size.
pub static POOL_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("flactory_pool_size", "Maximum number of concurrent encoders").unwrap()
});

/// Jobs waiting for a worker slot.
pub static POOL_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "flactory_pool_queued_jobs",
        "Number of jobs waiting for a worker slot",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    for collector in flactory_core::metrics::all_metrics() {
        registry.register(collector).unwrap();
    }

    registry
        .register(Box::new(TASKS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(POOL_SIZE.clone())).unwrap();
    registry.register(Box::new(POOL_QUEUED.clone())).unwrap();
}

/// Copy the orchestrator's current tallies into the gauges.
pub fn collect_dynamic_metrics(counts: &TaskCounts, pool: &PoolStatus) {
    for (status, value) in [
        ("pending", counts.pending),
        ("running", counts.running),
        ("completed", counts.completed),
        ("failed", counts.failed),
    ] {
        TASKS_BY_STATUS
            .with_label_values(&[status])
            .set(value as i64);
    }
    POOL_SIZE.set(pool.size as i64);
    POOL_QUEUED.set(pool.queued_jobs as i64);
}

/// Render all registered metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}
