//! Errors surfaced by resource lifecycle operations

use thiserror::Error;

pub type ResourceResult<T> = Result<T, ResourceError>;

#[derive(Debug, Error)]
pub enum ResourceError {
    /// Malformed identifier, bad repository block or schema violation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A remote call failed; `context` names the lifecycle phase
    #[error("{context}: {cause:#}")]
    RemoteApi {
        context: &'static str,
        cause: anyhow::Error,
    },

    /// The service returned an object that cannot be mapped back
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ResourceError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn remote(context: &'static str, cause: anyhow::Error) -> Self {
        Self::RemoteApi { context, cause }
    }

    /// Underlying client error for remote failures
    pub fn remote_cause(&self) -> Option<&anyhow::Error> {
        match self {
            Self::RemoteApi { cause, .. } => Some(cause),
            _ => None,
        }
    }
}
