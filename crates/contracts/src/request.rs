//! BatchRequest - input of one broadcast batch

use std::time::Duration;

/// Default number of concurrently executing delivery units
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Default upper bound on total batch wall time (5 hours)
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5 * 60 * 60);

/// A single broadcast request
///
/// Immutable once handed to the coordinator. Validation (non-empty payload,
/// `concurrency_bound >= 1`) happens at batch start so that the rejection is
/// reported through the batch's reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Text delivered to every destination
    pub payload: String,

    /// Maximum number of delivery units in flight
    pub concurrency_bound: usize,

    /// Global deadline, measured from batch start
    pub deadline: Duration,
}

impl BatchRequest {
    /// Create a request with default concurrency and deadline
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            concurrency_bound: DEFAULT_CONCURRENCY,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Override concurrency bound
    pub fn with_concurrency(mut self, concurrency_bound: usize) -> Self {
        self.concurrency_bound = concurrency_bound;
        self
    }

    /// Override global deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}
