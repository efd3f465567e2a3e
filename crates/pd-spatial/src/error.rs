//! Spatial-subsystem error type.

use thiserror::Error;

use pd_core::Position;

/// Errors produced by `pd-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// No obstacle-free path exists right now.  Non-fatal: callers treat it
    /// as "currently unreachable".
    #[error("no route from {from} to {to}")]
    NoRoute { from: Position, to: Position },

    #[error("position {0} is outside the map")]
    OutOfBounds(Position),

    /// A tile sequence contained a step that is not a single grid move.
    #[error("step {from} -> {to} is not a single grid move")]
    NonAdjacentStep { from: Position, to: Position },

    #[error("map parse error: {0}")]
    Parse(String),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
