use pd_core::Action;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("{action} still blocked after {attempts} attempts")]
    RetriesExhausted { action: Action, attempts: u32 },

    #[error("{action} at step {index} refused")]
    ActionFailed { action: Action, index: usize },
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
