//! TeeReporter - fan-out to several reporters

use std::sync::Arc;

use contracts::{ReportLine, Reporter};

/// Forwards every line to each wrapped reporter, in order
#[derive(Default)]
pub struct TeeReporter {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl TeeReporter {
    pub fn new(reporters: Vec<Arc<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for TeeReporter {
    fn emit(&self, line: ReportLine) {
        if let Some((last, rest)) = self.reporters.split_last() {
            for reporter in rest {
                reporter.emit(line.clone());
            }
            last.emit(line);
        }
    }
}
