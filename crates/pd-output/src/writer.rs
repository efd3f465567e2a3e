//! The `TraceWriter` trait implemented by trace backends.

use crate::{IntentionRow, OutputResult, StepRow};

/// Sink for trace rows.
///
/// Errors are stored by [`TraceObserver`][crate::TraceObserver] and
/// retrieved with `take_error`, since observer callbacks return nothing.
pub trait TraceWriter: Send {
    /// Write a batch of step rows.
    fn write_steps(&mut self, rows: &[StepRow]) -> OutputResult<()>;

    /// Write a batch of intention rows.
    fn write_intentions(&mut self, rows: &[IntentionRow]) -> OutputResult<()>;

    /// Flush all underlying file handles.
    ///
    /// Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
