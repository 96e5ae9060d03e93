//! Prometheus metrics for the orchestrator and pipeline.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

/// Tasks accepted onto the submission queue.
pub static TASKS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("storyforge_tasks_submitted_total", "Total tasks submitted").unwrap()
});

/// Tasks that reached the completed state.
pub static TASKS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "storyforge_tasks_completed_total",
        "Total tasks completed successfully",
    )
    .unwrap()
});

/// Tasks that reached the failed state.
pub static TASKS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("storyforge_tasks_failed_total", "Total tasks failed").unwrap()
});

/// Per-step execution duration.
pub static STEP_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "storyforge_step_duration_seconds",
            "Duration of pipeline steps",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 1800.0]),
        &["step"],
    )
    .unwrap()
});

/// Time spent waiting for the GPU gate.
pub static GPU_GATE_WAIT_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "storyforge_gpu_gate_wait_seconds",
            "Time spent waiting for the GPU gate",
        )
        .buckets(vec![0.001, 0.01, 0.1, 1.0, 10.0, 60.0, 300.0, 1800.0]),
    )
    .unwrap()
});

/// Dialogue lines cloned, by result.
pub static CLONED_LINES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("storyforge_cloned_lines_total", "Dialogue lines cloned"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// All core metrics, for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TASKS_SUBMITTED.clone()),
        Box::new(TASKS_COMPLETED.clone()),
        Box::new(TASKS_FAILED.clone()),
        Box::new(STEP_DURATION_SECONDS.clone()),
        Box::new(GPU_GATE_WAIT_SECONDS.clone()),
        Box::new(CLONED_LINES.clone()),
    ]
}
