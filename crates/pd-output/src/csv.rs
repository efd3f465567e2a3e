//! CSV trace backend.
//!
//! Creates `steps.csv` and `intentions.csv` in the configured directory.

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;

use crate::writer::TraceWriter;
use crate::{IntentionRow, OutputResult, StepRow};

/// Writes a run trace to two CSV files.
pub struct CsvTraceWriter {
    steps:      Writer<File>,
    intentions: Writer<File>,
    finished:   bool,
}

impl CsvTraceWriter {
    /// Create `dir` if needed, open both files and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let mut steps = Writer::from_path(dir.join("steps.csv"))?;
        steps.write_record(["agent", "at_ms", "index", "action", "attempt", "status", "x", "y"])?;

        let mut intentions = Writer::from_path(dir.join("intentions.csv"))?;
        intentions.write_record(["agent", "at_ms", "event", "subject", "detail"])?;

        Ok(Self { steps, intentions, finished: false })
    }
}

impl TraceWriter for CsvTraceWriter {
    fn write_steps(&mut self, rows: &[StepRow]) -> OutputResult<()> {
        for row in rows {
            self.steps.write_record(&[
                row.agent.clone(),
                row.at_ms.to_string(),
                row.index.to_string(),
                row.action.to_string(),
                row.attempt.to_string(),
                row.status.clone(),
                row.x.to_string(),
                row.y.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_intentions(&mut self, rows: &[IntentionRow]) -> OutputResult<()> {
        for row in rows {
            let at_ms = row.at_ms.to_string();
            self.intentions.write_record([
                row.agent.as_str(),
                at_ms.as_str(),
                row.event.as_str(),
                row.subject.as_str(),
                row.detail.as_str(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.steps.flush()?;
        self.intentions.flush()?;
        Ok(())
    }
}
