//! # Sync Metrics
//!
//! Metrics for sync runs: run counts, fatal errors, applied operation actions,
//! isolated per-item failures and run duration.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

static SYNCS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("apim_sync_syncs_total", "Total number of sync runs started")
        .expect("Failed to create SYNCS_TOTAL metric - this should never happen")
});

static SYNC_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apim_sync_sync_errors_total",
            "Total number of sync runs aborted by a fatal error, by stage",
        ),
        &["stage"],
    )
    .expect("Failed to create SYNC_ERRORS_TOTAL metric - this should never happen")
});

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apim_sync_operations_total",
            "Total number of remote operations successfully reconciled, by action",
        ),
        &["action"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static ITEM_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apim_sync_item_failures_total",
            "Total number of operation jobs that failed without aborting the sync, by action",
        ),
        &["action"],
    )
    .expect("Failed to create ITEM_FAILURES_TOTAL metric - this should never happen")
});

static SYNC_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "apim_sync_sync_duration_seconds",
            "Duration of sync runs in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .expect("Failed to create SYNC_DURATION metric - this should never happen")
});

pub(crate) fn register_sync_metrics() -> Result<()> {
    REGISTRY.register(Box::new(SYNCS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ITEM_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SYNC_DURATION.clone()))?;
    Ok(())
}

pub fn increment_syncs_total() {
    SYNCS_TOTAL.inc();
}

pub fn increment_sync_errors_total(stage: &str) {
    SYNC_ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

/// `action` is one of `create`, `edit`, `delete`
pub fn record_operation(action: &str) {
    OPERATIONS_TOTAL.with_label_values(&[action]).inc();
}

pub fn increment_item_failures_total(action: &str) {
    ITEM_FAILURES_TOTAL.with_label_values(&[action]).inc();
}

pub fn observe_sync_duration(duration: f64) {
    SYNC_DURATION.observe(duration);
}
