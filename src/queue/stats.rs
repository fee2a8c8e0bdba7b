//! Atomic counters describing queue throughput.
//!
//! Updated by the coordinator and dispatcher tasks, read without locking
//! through [`QueueStats`] snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::FlushTrigger;

#[derive(Debug, Default)]
pub(crate) struct QueueMetrics {
    submitted: AtomicU64,
    rejected: AtomicU64,
    batches_flushed: AtomicU64,
    items_flushed: AtomicU64,
    failed_batches: AtomicU64,
    size_flushes: AtomicU64,
    interval_flushes: AtomicU64,
    shutdown_flushes: AtomicU64,
}

impl QueueMetrics {
    #[inline(always)]
    pub(crate) fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_reject(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, trigger: FlushTrigger, items: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.items_flushed.fetch_add(items as u64, Ordering::Relaxed);
        let by_trigger = match trigger {
            FlushTrigger::Size => &self.size_flushes,
            FlushTrigger::Interval => &self.interval_flushes,
            FlushTrigger::Shutdown => &self.shutdown_flushes,
        };
        by_trigger.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_failure(&self) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            items_flushed: self.items_flushed.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            size_flushes: self.size_flushes.load(Ordering::Relaxed),
            interval_flushes: self.interval_flushes.load(Ordering::Relaxed),
            shutdown_flushes: self.shutdown_flushes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of queue counters.
///
/// `batches_flushed` counts batches frozen by the coordinator; a batch is
/// counted before the consumer sees it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted: u64,
    pub rejected: u64,
    pub batches_flushed: u64,
    pub items_flushed: u64,
    pub failed_batches: u64,
    pub size_flushes: u64,
    pub interval_flushes: u64,
    pub shutdown_flushes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_counters_by_trigger() {
        let metrics = QueueMetrics::default();
        metrics.record_flush(FlushTrigger::Size, 3);
        metrics.record_flush(FlushTrigger::Interval, 2);
        metrics.record_flush(FlushTrigger::Shutdown, 1);
        metrics.record_flush(FlushTrigger::Size, 3);

        let stats = metrics.snapshot();
        assert_eq!(stats.batches_flushed, 4);
        assert_eq!(stats.items_flushed, 9);
        assert_eq!(stats.size_flushes, 2);
        assert_eq!(stats.interval_flushes, 1);
        assert_eq!(stats.shutdown_flushes, 1);
    }

    #[test]
    fn test_submit_and_failure_counters() {
        let metrics = QueueMetrics::default();
        metrics.record_submit();
        metrics.record_submit();
        metrics.record_reject();
        metrics.record_failure();

        let stats = metrics.snapshot();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.failed_batches, 1);
        assert_eq!(stats.batches_flushed, 0);
    }
}
