//! LogReporter - reports via tracing

use contracts::{ReportLine, Reporter};
use tracing::{info, warn};

/// Reporter that turns report lines into structured log events
pub struct LogReporter {
    name: String,
}

impl LogReporter {
    /// Create a new LogReporter with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Reporter for LogReporter {
    fn emit(&self, line: ReportLine) {
        match &line {
            ReportLine::Progress(succeeded) => {
                info!(reporter = %self.name, succeeded, "Broadcast progress");
            }
            ReportLine::Failure(destination) => {
                warn!(reporter = %self.name, destination = %destination, "Broadcast failed for destination");
            }
            ReportLine::Summary(report) => {
                info!(
                    reporter = %self.name,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    skipped = report.skipped,
                    elapsed_secs = report.elapsed.as_secs_f64(),
                    deadline_expired = report.deadline_expired,
                    interrupted = report.interrupted,
                    "{line}"
                );
            }
            ReportLine::Usage(message) => {
                warn!(reporter = %self.name, "{message}");
            }
        }
    }
}
