use pd_core::AgentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("message from non-teammate {0}")]
    UnknownSender(AgentId),
}

pub type NegotiationResult<T> = Result<T, NegotiationError>;
