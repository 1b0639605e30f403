//! Batch processor counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters shared by the processor handle and its flush loop
#[derive(Debug, Default)]
pub struct BatchMetrics {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    batches_delivered: AtomicU64,
    events_delivered: AtomicU64,
    batches_failed: AtomicU64,
    events_failed: AtomicU64,
    retries: AtomicU64,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event refused because the queue was full or stopped
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, events: usize, attempts: u32) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.events_delivered.fetch_add(events as u64, Ordering::Relaxed);
        self.record_retries(attempts);
    }

    pub fn record_failed(&self, events: usize, attempts: u32) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.events_failed.fetch_add(events as u64, Ordering::Relaxed);
        self.record_retries(attempts);
    }

    fn record_retries(&self, attempts: u32) {
        let retries = u64::from(attempts.saturating_sub(1));
        if retries > 0 {
            self.retries.fetch_add(retries, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> BatchMetricsSnapshot {
        BatchMetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`BatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchMetricsSnapshot {
    pub enqueued: u64,
    pub rejected: u64,
    pub batches_delivered: u64,
    pub events_delivered: u64,
    pub batches_failed: u64,
    pub events_failed: u64,
    pub retries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = BatchMetrics::new();
        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_rejected();
        metrics.record_delivered(2, 1);
        metrics.record_failed(3, 4);

        assert_eq!(
            metrics.snapshot(),
            BatchMetricsSnapshot {
                enqueued: 2,
                rejected: 1,
                batches_delivered: 1,
                events_delivered: 2,
                batches_failed: 1,
                events_failed: 3,
                retries: 3,
            }
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let value = serde_json::to_value(BatchMetricsSnapshot::default()).unwrap();
        assert_eq!(value["events_delivered"], 0);
    }
}
