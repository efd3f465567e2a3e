use pd_core::{AgentId, CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("invalid agent identity: {0:?}")]
    Identity(String),

    #[error("invalid teammate {id}: {reason}")]
    Teammate { id: AgentId, reason: &'static str },
}

pub type AgentResult<T> = Result<T, AgentError>;
