//! Worker error types.

use thiserror::Error;

use splice_media::MediaError;
use splice_models::{ConfigError, StageTransitionError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Job task aborted: {0}")]
    JobAborted(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageTransitionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// True when the external binary is absent.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, WorkerError::Media(e) if e.is_tool_missing())
    }

    /// True when the request was rejected before anything ran.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            WorkerError::InvalidRequest(_) | WorkerError::Config(_) => true,
            WorkerError::Media(e) => e.is_invalid_input(),
            _ => false,
        }
    }
}
