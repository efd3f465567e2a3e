//! Framework error type.
//!
//! Sub-crates define their own error enums and convert `CoreError` into them
//! via `From` impls where a core failure can surface.

use thiserror::Error;

use crate::Position;

/// The top-level error type for `pd-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("step {from} -> {to} is not a single grid move")]
    NotAdjacent { from: Position, to: Position },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand result type for all `pd-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
