//! Dispatch queue metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use observability::{RunningStats, StatsSummary};
use parking_lot::Mutex;

/// Metrics for one dispatch queue
///
/// `sent` lives in `RelayStats`, these are the delivery-side details.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Current pending length
    pending_len: AtomicUsize,
    /// Completed flush passes
    flush_count: AtomicU64,
    /// Failed transport calls, first attempts and retries
    failure_count: AtomicU64,
    /// Items moved into a retry set
    retry_count: AtomicU64,
    /// Items given up on
    dropped_count: AtomicU64,
    /// Batch sizes of completed passes
    batch_sizes: Mutex<RunningStats>,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending_len.load(Ordering::Relaxed)
    }

    pub fn set_pending_len(&self, len: usize) {
        self.pending_len.store(len, Ordering::Relaxed);
    }

    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::Relaxed)
    }

    /// Record a finished pass and its batch size
    pub fn record_flush(&self, batch_size: usize) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        self.batch_sizes.lock().push(batch_size as f64);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    pub fn inc_retry_count(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Batch size distribution
    pub fn batch_summary(&self) -> StatsSummary {
        StatsSummary::from(&*self.batch_sizes.lock())
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pending_len: self.pending_len(),
            flush_count: self.flush_count(),
            failure_count: self.failure_count(),
            retry_count: self.retry_count(),
            dropped_count: self.dropped_count(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub pending_len: usize,
    pub flush_count: u64,
    pub failure_count: u64,
    pub retry_count: u64,
    pub dropped_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_batch_summary() {
        let metrics = DispatchMetrics::new();
        metrics.record_flush(2);
        metrics.record_flush(4);
        metrics.inc_failure_count();
        metrics.inc_retry_count();
        metrics.inc_dropped_count();

        let snap = metrics.snapshot();
        assert_eq!(snap.flush_count, 2);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.retry_count, 1);
        assert_eq!(snap.dropped_count, 1);

        let summary = metrics.batch_summary();
        assert_eq!(summary.count, 2);
        assert!((summary.mean - 3.0).abs() < f64::EPSILON);
    }
}
