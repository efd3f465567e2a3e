use pd_core::{AgentId, Position};
use pd_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("{0} is not walkable")]
    NotWalkable(Position),

    #[error("{0} is occupied")]
    Occupied(Position),

    #[error("agent {0} is already connected")]
    DuplicateAgent(AgentId),

    #[error("map error: {0}")]
    Spatial(#[from] SpatialError),
}

pub type WorldResult<T> = Result<T, WorldError>;
