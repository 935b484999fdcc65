//! Delivery outcomes, batch report and the text stream line format.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::DestinationId;

/// Result of exactly one delivery unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Payload handed to the gateway successfully
    Delivered,
    /// No usable session or no recipients; counts neither as success nor failure
    SkippedNoRecipients,
    /// Resolution or delivery raised an error
    Failed(String),
}

impl DeliveryOutcome {
    /// Label used for log fields and metric labels
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::SkippedNoRecipients => "skipped",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Final report of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Successful deliveries
    pub succeeded: u64,
    /// Failed deliveries
    pub failed: u64,
    /// Wall time from batch start to report
    pub elapsed: Duration,
    /// Destinations handed to the worker pool
    pub submitted: u64,
    /// Destinations skipped for lack of session or recipients
    pub skipped: u64,
    /// Whether the global deadline cut the batch short
    pub deadline_expired: bool,
    /// Whether a shutdown request cut the batch short
    pub interrupted: bool,
}

impl BatchReport {
    /// Units that produced an outcome counted in the summary
    pub fn processed(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// One line of the append-only report stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    /// Running success total, emitted on every multiple of the progress stride
    Progress(u64),
    /// A destination whose delivery failed
    Failure(DestinationId),
    /// Final line of a batch
    Summary(BatchReport),
    /// Pre-flight rejection, no work scheduled
    Usage(String),
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Progress(succeeded) => write!(f, "{succeeded}"),
            Self::Failure(id) => write!(f, "Failed for destination: {id}"),
            Self::Summary(report) => write!(
                f,
                "Processed: {}/{} convs in {}sec",
                report.succeeded,
                report.failed,
                report.elapsed.as_secs()
            ),
            Self::Usage(message) => write!(f, "{message}"),
        }
    }
}
