//! Error types for pd-output.

use thiserror::Error;

/// Failure to persist an agent trace.  The agent keeps running; the
/// observer only remembers the first one.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("trace file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace row could not be encoded: {0}")]
    Csv(#[from] csv::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;
