//! API error type and HTTP response conversion.
//!
//! Grounded on `orchestrator::api::error::ApiError`: one thiserror
//! enum with a `status_code`/`code`/`error_type` accessor triple and a
//! single `IntoResponse` impl, rather than per-handler status juggling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use llm_gateway::GatewayError;
use persistence::StoreError;
use sandbox::SandboxError;
use workflows::error::WorkflowError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    ValidationError(String),

    /// Surfaces `StoreError::TaskLocked` (§9's concurrency decision:
    /// one workflow at a time per task, no queueing at the façade).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(StoreError::TaskNotFound(_) | StoreError::CaseNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::TaskLocked(_) | StoreError::DuplicateCaseId(_)) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Sandbox(_) => StatusCode::BAD_GATEWAY,
            ApiError::Workflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Store(StoreError::TaskNotFound(_) | StoreError::CaseNotFound(_)) => "NOT_FOUND",
            ApiError::Store(StoreError::TaskLocked(_)) => "TASK_LOCKED",
            ApiError::Store(StoreError::DuplicateCaseId(_)) => "CONFLICT",
            ApiError::Store(_) => "STORE_ERROR",
            ApiError::Gateway(_) => "GATEWAY_ERROR",
            ApiError::Sandbox(_) => "SANDBOX_ERROR",
            ApiError::Workflow(_) => "WORKFLOW_ERROR",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::Conflict(_) => "Conflict",
            ApiError::InternalError(_) => "InternalError",
            ApiError::Store(_) => "StoreError",
            ApiError::Gateway(_) => "GatewayError",
            ApiError::Sandbox(_) => "SandboxError",
            ApiError::Workflow(_) => "WorkflowError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());
        tracing::error!("API error: {:?}", body);
        (status, Json(body)).into_response()
    }
}
