//! Sandbox controller error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SandboxError>;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("session was not initialized before use")]
    NotInitialized,

    #[error("tool call {0:?} reported failure: {1}")]
    ToolFailed(String, String),
}
