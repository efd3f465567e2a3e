use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("solver failed: {0}")]
    Solver(String),

    #[error("unknown solver step '{0}'")]
    UnknownStep(String),

    #[error(transparent)]
    Spatial(#[from] pd_spatial::SpatialError),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
