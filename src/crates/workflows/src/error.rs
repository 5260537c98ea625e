//! Errors surfaced by workflow-adjacent helpers (dispatch, report
//! generation). Workflow *nodes* themselves never return these directly
//! — per §4.1, a node catches its own failures and encodes them into
//! `state.status`/`state.errors`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("command strategy referenced an unknown tool {0:?}")]
    UnknownTool(String),

    #[error("command strategy is missing required parameter {0:?}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Sandbox(#[from] sandbox::SandboxError),

    #[error(transparent)]
    Gateway(#[from] llm_gateway::GatewayError),

    #[error(transparent)]
    Store(#[from] persistence::StoreError),

    #[error("spreadsheet generation failed: {0}")]
    Spreadsheet(String),
}
