//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Dispatcher (submissions, pool occupancy)
//! - Pipeline (stage durations, retries, terminal outcomes)
//! - Progress bus (events published/dropped)

use once_cell::sync::Lazy;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
};

// =============================================================================
// Dispatcher Metrics
// =============================================================================

/// Tasks submitted to the dispatcher queue.
pub static TASKS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("verbatim_tasks_submitted_total", "Total tasks submitted").unwrap()
});

/// Pipelines currently executing.
pub static TASKS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "verbatim_tasks_running",
        "Number of pipelines currently executing",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Terminal task outcomes.
pub static TASKS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("verbatim_tasks_finished_total", "Total tasks finished"),
        &["result"], // "completed", "failed", "cancelled"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "verbatim_stage_duration_seconds",
            "Duration of pipeline stages",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 1800.0]),
        &["stage"],
    )
    .unwrap()
});

/// Retry attempts total by stage.
pub static STAGE_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("verbatim_stage_retries_total", "Total stage retry attempts"),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Progress Bus Metrics
// =============================================================================

/// Progress events published by status.
pub static PROGRESS_EVENTS_PUBLISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "verbatim_progress_events_published_total",
            "Total progress events published",
        ),
        &["status"],
    )
    .unwrap()
});

/// Progress events dropped due to slow subscribers.
pub static PROGRESS_EVENTS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "verbatim_progress_events_dropped_total",
        "Total progress events dropped because a subscriber buffer was full",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TASKS_SUBMITTED.clone()),
        Box::new(TASKS_RUNNING.clone()),
        Box::new(TASKS_FINISHED.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(STAGE_RETRIES.clone()),
        Box::new(PROGRESS_EVENTS_PUBLISHED.clone()),
        Box::new(PROGRESS_EVENTS_DROPPED.clone()),
    ]
}
