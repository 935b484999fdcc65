//! Reporter trait - batch output stream interface

use crate::{BatchReport, DestinationId, ReportLine};

/// Append-only sink for progress, failure and summary lines
///
/// Called concurrently from every worker; implementations serialize writes
/// internally. Emitting never fails from the caller's point of view.
pub trait Reporter: Send + Sync {
    /// Append one line
    fn emit(&self, line: ReportLine);

    /// Running success total
    fn emit_progress(&self, succeeded: u64) {
        self.emit(ReportLine::Progress(succeeded));
    }

    /// Destination whose delivery failed
    fn emit_failure(&self, destination: &DestinationId) {
        self.emit(ReportLine::Failure(destination.clone()));
    }

    /// Final line of a batch
    fn emit_summary(&self, report: &BatchReport) {
        self.emit(ReportLine::Summary(report.clone()));
    }

    /// Pre-flight rejection message
    fn emit_usage(&self, message: &str) {
        self.emit(ReportLine::Usage(message.to_string()));
    }
}
