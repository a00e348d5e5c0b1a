//! Prometheus metrics for job processing.
//!
//! This module provides metrics for:
//! - Job outcomes and durations
//! - Staged upload volume
//! - Worker stderr volume

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// =============================================================================
// Job Metrics
// =============================================================================

/// Finished submissions by outcome.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("weaver_jobs_total", "Total submissions by outcome"),
        &["outcome"], // "succeeded" or an error code: "validation_failure", "io_failure", ...
    )
    .unwrap()
});

/// End-to-end submission duration.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "weaver_job_duration_seconds",
            "Duration of a submission from receipt to outcome",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Submissions currently being processed.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("weaver_jobs_in_flight", "Submissions currently in progress").unwrap()
});

// =============================================================================
// Staging / Worker Metrics
// =============================================================================

/// Bytes written to the staging directory.
pub static STAGED_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("weaver_staged_bytes_total", "Total bytes staged").unwrap()
});

/// Bytes of stderr received from workers, including evicted bytes.
pub static STDERR_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "weaver_stderr_bytes_total",
        "Total stderr bytes received from workers",
    )
    .unwrap()
});

/// Registers all core metrics with `registry`.
pub fn register(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(JOBS_TOTAL.clone()))?;
    registry.register(Box::new(JOB_DURATION.clone()))?;
    registry.register(Box::new(JOBS_IN_FLIGHT.clone()))?;
    registry.register(Box::new(STAGED_BYTES_TOTAL.clone()))?;
    registry.register(Box::new(STDERR_BYTES_TOTAL.clone()))?;
    Ok(())
}

/// Records a finished submission.
pub fn record_outcome(outcome: &str, duration_secs: f64) {
    JOBS_TOTAL.with_label_values(&[outcome]).inc();
    JOB_DURATION.with_label_values(&[outcome]).observe(duration_secs);
}
