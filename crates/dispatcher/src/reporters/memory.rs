//! MemoryReporter - keeps lines in memory

use std::sync::Mutex;

use contracts::{BatchReport, DestinationId, ReportLine, Reporter};

/// Reporter collecting every line, for embedding callers and tests
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<ReportLine>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines in emission order
    pub fn lines(&self) -> Vec<ReportLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Lines rendered as the text stream would show them
    pub fn rendered(&self) -> Vec<String> {
        self.lines().iter().map(ToString::to_string).collect()
    }

    /// Progress values in emission order
    pub fn progress(&self) -> Vec<u64> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ReportLine::Progress(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Destinations named by failure lines
    pub fn failures(&self) -> Vec<DestinationId> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ReportLine::Failure(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Summaries emitted so far (one per batch)
    pub fn summaries(&self) -> Vec<BatchReport> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ReportLine::Summary(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, line: ReportLine) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}
