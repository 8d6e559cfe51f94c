use thiserror::Error;
use voxflow_core::{SessionId, SettingsError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("session {0} is already streaming")]
    SessionAlreadyActive(SessionId),

    #[error("session {0} is not active")]
    SessionNotFound(SessionId),

    #[error("invalid pipeline settings: {0}")]
    InvalidSettings(#[from] SettingsError),
}
