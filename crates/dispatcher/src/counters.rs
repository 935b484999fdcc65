//! Aggregate counters shared by all delivery units of a batch

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free batch counters
///
/// Units only ever increment. The coordinator reads through [`take`] once
/// the pool has drained, which also zeroes the counters for the next batch.
///
/// [`take`]: AggregateCounters::take
#[derive(Debug, Default)]
pub struct AggregateCounters {
    /// Successful deliveries
    succeeded: AtomicU64,
    /// Failed deliveries
    failed: AtomicU64,
    /// Destinations handed to the pool
    submitted: AtomicU64,
    /// Destinations skipped (no session, no recipients)
    skipped: AtomicU64,
}

impl AggregateCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment success count, returning the post-increment total
    pub fn record_success(&self) -> u64 {
        self.succeeded.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Increment failure count, returning the post-increment total
    pub fn record_failure(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Increment submitted count
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment skipped count
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Read without resetting
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Read and reset to zero
    pub fn take(&self) -> CountersSnapshot {
        CountersSnapshot {
            succeeded: self.succeeded.swap(0, Ordering::Relaxed),
            failed: self.failed.swap(0, Ordering::Relaxed),
            submitted: self.submitted.swap(0, Ordering::Relaxed),
            skipped: self.skipped.swap(0, Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`AggregateCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub succeeded: u64,
    pub failed: u64,
    pub submitted: u64,
    pub skipped: u64,
}

impl CountersSnapshot {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
