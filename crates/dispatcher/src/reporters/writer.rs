//! WriterReporter - append-only text stream

use std::io::Write;
use std::sync::Mutex;

use contracts::{ReportLine, Reporter};
use tracing::error;

/// Reporter that writes one line per event to any `Write`
///
/// Every line is flushed immediately so a live reader sees progress as it
/// happens. Write errors are logged and otherwise ignored: losing the stream
/// must not affect deliveries.
pub struct WriterReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterReporter<W> {
    /// Wrap a writer
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_line(out: &mut W, line: &ReportLine) -> std::io::Result<()> {
        writeln!(out, "{line}")?;
        out.flush()
    }
}

impl WriterReporter<std::io::Stdout> {
    /// Reporter on process stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Reporter for WriterReporter<W> {
    fn emit(&self, line: ReportLine) {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = Self::write_line(&mut out, &line) {
            error!(error = %e, line = %line, "Report stream write failed");
        }
    }
}
