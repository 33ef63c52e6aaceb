//! Engine metrics
//!
//! Every record goes to the `metrics` facade and to an in-process counter, so
//! the numbers are available whether or not an exporter is installed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Register descriptions for the engine's counters with the installed recorder
pub fn describe_metrics() {
    metrics::describe_counter!(
        "reqcheck_events_total",
        "Total number of raw compliance events handled"
    );
    metrics::describe_counter!(
        "reqcheck_settles_total",
        "Total number of settled verdicts applied"
    );
    metrics::describe_counter!(
        "reqcheck_superseded_total",
        "Total number of pending settles cancelled before firing"
    );
    metrics::describe_counter!(
        "reqcheck_invalidations_total",
        "Total number of ancestors reset by upward invalidation"
    );
    metrics::describe_counter!(
        "reqcheck_faults_total",
        "Total number of evaluation faults reported by the feed"
    );
}

/// Counters for one aggregator
#[derive(Clone)]
pub struct EngineMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    events: AtomicU64,
    settles: AtomicU64,
    superseded: AtomicU64,
    invalidations: AtomicU64,
    faults: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record a raw event reaching the aggregator
    pub fn record_event(&self) {
        self.inner.events.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reqcheck_events_total").increment(1);
    }

    /// Record a settled verdict being applied
    pub fn record_settle(&self) {
        self.inner.settles.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reqcheck_settles_total").increment(1);
    }

    /// Record a pending settle cancelled by a newer event
    pub fn record_superseded(&self) {
        self.inner.superseded.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reqcheck_superseded_total").increment(1);
    }

    /// Record an ancestor reset by upward invalidation
    pub fn record_invalidation(&self) {
        self.inner.invalidations.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reqcheck_invalidations_total").increment(1);
    }

    /// Record an evaluation fault
    pub fn record_fault(&self) {
        self.inner.faults.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("reqcheck_faults_total").increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events: self.inner.events.load(Ordering::Relaxed),
            settles: self.inner.settles.load(Ordering::Relaxed),
            superseded: self.inner.superseded.load(Ordering::Relaxed),
            invalidations: self.inner.invalidations.load(Ordering::Relaxed),
            faults: self.inner.faults.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events: u64,
    pub settles: u64,
    pub superseded: u64,
    pub invalidations: u64,
    pub faults: u64,
}

impl MetricsSnapshot {
    /// Share of handled events whose pending settle got superseded
    pub fn supersede_rate(&self) -> f64 {
        if self.events == 0 {
            0.0
        } else {
            self.superseded as f64 / self.events as f64
        }
    }
}
