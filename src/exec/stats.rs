//! Execution statistics counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated across one logical session of engine calls.
///
/// Safe under concurrent increment; reset explicitly between test scenarios.
/// `queries_run` counts SELECT statements (including retry probes);
/// `batches_run` counts physical mutation statements.
#[derive(Debug, Default)]
pub struct QueryStats {
    queries_run: AtomicU64,
    batches_run: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// SELECT statements executed.
    pub queries_run: u64,
    /// Mutation statements executed.
    pub batches_run: u64,
}

impl QueryStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one executed query.
    pub fn record_query(&self) {
        self.queries_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one executed mutation statement.
    pub fn record_batch(&self) {
        self.batches_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queries_run: self.queries_run.load(Ordering::Relaxed),
            batches_run: self.batches_run.load(Ordering::Relaxed),
        }
    }

    /// Zeroes both counters.
    pub fn reset(&self) {
        self.queries_run.store(0, Ordering::Relaxed);
        self.batches_run.store(0, Ordering::Relaxed);
    }
}
