//! Indexer observability counters.
//!
//! One [`IndexMetrics`] lives in each [`crate::Indexer`]; counters are
//! relaxed atomics, so snapshots taken while a batch runs may be torn across
//! fields.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::index_update::IndexOperation;

/// Point-in-time copy of [`IndexMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IndexMetricsSnapshot {
    /// Mutations whose index updates were derived.
    pub mutations_indexed: u64,
    /// Mutations whose derivation failed.
    pub mutations_failed: u64,
    pub index_puts: u64,
    pub index_deletes: u64,
    /// Compensating deletes emitted because newer cells already existed.
    pub back_in_time_corrections: u64,
    /// Re-evaluations at a newer boundary timestamp.
    pub roll_forward_steps: u64,
}

#[derive(Debug, Default)]
pub struct IndexMetrics {
    mutations_indexed: AtomicU64,
    mutations_failed: AtomicU64,
    index_puts: AtomicU64,
    index_deletes: AtomicU64,
    back_in_time_corrections: AtomicU64,
    roll_forward_steps: AtomicU64,
}

impl IndexMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_indexed(&self) {
        self.mutations_indexed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.mutations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self, operation: IndexOperation) {
        let counter = match operation {
            IndexOperation::Put => &self.index_puts,
            IndexOperation::Delete => &self.index_deletes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_corrections(&self, count: u64) {
        self.back_in_time_corrections.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_roll_forward_steps(&self, count: u64) {
        self.roll_forward_steps.fetch_add(count, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> IndexMetricsSnapshot {
        IndexMetricsSnapshot {
            mutations_indexed: self.mutations_indexed.load(Ordering::Relaxed),
            mutations_failed: self.mutations_failed.load(Ordering::Relaxed),
            index_puts: self.index_puts.load(Ordering::Relaxed),
            index_deletes: self.index_deletes.load(Ordering::Relaxed),
            back_in_time_corrections: self.back_in_time_corrections.load(Ordering::Relaxed),
            roll_forward_steps: self.roll_forward_steps.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter (tests and diagnostics).
    pub fn reset(&self) {
        for counter in [
            &self.mutations_indexed,
            &self.mutations_failed,
            &self.index_puts,
            &self.index_deletes,
            &self.back_in_time_corrections,
            &self.roll_forward_steps,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_reset() {
        let metrics = IndexMetrics::new();
        metrics.record_indexed();
        metrics.record_indexed();
        metrics.record_failed();
        metrics.record_update(IndexOperation::Put);
        metrics.record_update(IndexOperation::Delete);
        metrics.record_update(IndexOperation::Delete);
        metrics.record_corrections(3);
        metrics.record_roll_forward_steps(2);

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            IndexMetricsSnapshot {
                mutations_indexed: 2,
                mutations_failed: 1,
                index_puts: 1,
                index_deletes: 2,
                back_in_time_corrections: 3,
                roll_forward_steps: 2,
            }
        );

        metrics.reset();
        assert_eq!(metrics.snapshot(), IndexMetricsSnapshot::default());
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let metrics = IndexMetrics::new();
        metrics.record_update(IndexOperation::Put);
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["index_puts"], 1);
        assert_eq!(json["roll_forward_steps"], 0);
    }
}
