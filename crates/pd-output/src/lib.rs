//! `pd-output` — run traces for offline diagnostics.
//!
//! [`TraceObserver`] implements `pd_agent::AgentObserver` and forwards rows
//! to any [`TraceWriter`].  The CSV backend creates:
//!
//! | File              | One row per                                        |
//! |-------------------|----------------------------------------------------|
//! | `steps.csv`       | executed action attempt (ok, retrying, failed)     |
//! | `intentions.csv`  | intention adopted or dropped, role change          |
//!
//! # Usage
//!
//! ```rust,ignore
//! use pd_output::{CsvTraceWriter, TraceObserver};
//!
//! let writer = CsvTraceWriter::new(Path::new("./trace/alice"))?;
//! let mut obs = TraceObserver::new(writer);
//! agent.run(perceptions, &mut obs).await;
//! if let Some(e) = obs.take_error() { eprintln!("trace error: {e}"); }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(test)]
mod tests;

pub use csv::CsvTraceWriter;
pub use error::{OutputError, OutputResult};
pub use observer::TraceObserver;
pub use row::{IntentionEvent, IntentionRow, StepRow};
pub use writer::TraceWriter;
