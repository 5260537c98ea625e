//! Gateway error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid API key format, expected \"id.secret\"")]
    InvalidApiKey,

    #[error("response did not contain any choices")]
    EmptyResponse,

    #[error("could not locate a JSON object in the model's response")]
    NoJsonFound,

    #[error("failed to parse extracted JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API调用失败: exhausted {0} attempts")]
    Exhausted(u32),
}
