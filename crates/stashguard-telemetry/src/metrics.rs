//! In-process evaluation statistics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stashguard_core::Result;
use stashguard_policy::Decision;

/// Counts decisions as they are made, cheap to clone across threads
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    evaluations: AtomicU64,
    permitted: AtomicU64,
    denied: AtomicU64,
    errors: AtomicU64,
    recorded: AtomicU64,
    total_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record the outcome of one authorization
    pub fn record_outcome(&self, outcome: &Result<Decision>, latency: Duration) {
        self.inner.evaluations.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);

        let counter = match outcome {
            Ok(decision) if decision.permitted => &self.inner.permitted,
            Ok(_) => &self.inner.denied,
            Err(_) => &self.inner.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a ledger entry committed to a stash
    pub fn record_commit(&self) {
        self.inner.recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            evaluations: self.inner.evaluations.load(Ordering::Relaxed),
            permitted: self.inner.permitted.load(Ordering::Relaxed),
            denied: self.inner.denied.load(Ordering::Relaxed),
            errors: self.inner.errors.load(Ordering::Relaxed),
            recorded: self.inner.recorded.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub evaluations: u64,
    pub permitted: u64,
    pub denied: u64,
    pub errors: u64,
    pub recorded: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Average latency per evaluation
    pub fn avg_latency_us(&self) -> u64 {
        if self.evaluations == 0 {
            0
        } else {
            self.total_latency_us / self.evaluations
        }
    }

    /// Share of evaluations that ended in a denial
    pub fn denial_rate(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.denied as f64 / self.evaluations as f64
        }
    }
}
