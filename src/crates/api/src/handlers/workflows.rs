//! Endpoints that trigger a workflow run against a task: Selection
//! ("prepare"), Execution ("execute"/per-case), sandbox teardown
//! ("release"), and Report.
//!
//! Every trigger takes the task's advisory lock for its whole run
//! (§9's concurrency decision — one workflow per task at a time,
//! conflicting triggers get a 409 rather than racing).

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use workflow_core::CompiledGraph;
use workflows::execution::ExecutionState;
use workflows::report::ReportState;
use workflows::selection::SelectionState;

use crate::error::{ApiError, ApiResult};
use crate::response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct WorkflowRunResponse {
    status: String,
    errors: Vec<String>,
}

/// POST /api/v1/tasks/:task_id/prepare — runs Selection: picks a
/// sample image per test case from the task's dataset.
pub async fn trigger_prepare(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let _guard = state.store.try_lock_task(&task_id)?;

    let session = state.sandbox_factory.open_session();
    let graph = CompiledGraph::compile(workflows::selection::build(state.gateway.clone(), state.store.clone(), session))
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let result = graph.run(SelectionState::new(task_id)).await;

    Ok(response::ok(WorkflowRunResponse { status: result.status, errors: result.errors }))
}

async fn run_execution(state: &AppState, task_id: &str, case_id: Option<String>) -> ApiResult<ExecutionState> {
    let task = state.store.get_task(task_id).await?;

    let mut initial = ExecutionState::new(task.task_id.clone(), task.algorithm_image.clone(), task.dataset_location.clone());
    initial.case_id = case_id;

    let session = state.sandbox_factory.open_session();
    let graph = CompiledGraph::compile(workflows::execution::build(state.gateway.clone(), state.store.clone(), session))
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(graph.run(initial).await)
}

/// POST /api/v1/tasks/:task_id/execute — runs Execution over every
/// case belonging to the task.
pub async fn trigger_execute(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let _guard = state.store.try_lock_task(&task_id)?;
    let result = run_execution(&state, &task_id, None).await?;
    Ok(response::ok(WorkflowRunResponse { status: result.status, errors: result.errors }))
}

/// POST /api/v1/tasks/:task_id/cases/:case_id/execute — runs Execution
/// restricted to a single case.
pub async fn execute_case(
    State(state): State<AppState>,
    Path((task_id, case_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.store.try_lock_task(&task_id)?;
    let result = run_execution(&state, &task_id, Some(case_id)).await?;
    Ok(response::ok(WorkflowRunResponse { status: result.status, errors: result.errors }))
}

/// POST /api/v1/tasks/:task_id/release — tears down the task's sandbox
/// container, idempotent if none is provisioned.
pub async fn trigger_release(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let _guard = state.store.try_lock_task(&task_id)?;
    let task = state.store.get_task(&task_id).await?;

    if let Some(sandbox_name) = &task.sandbox_name {
        let session = state.sandbox_factory.open_session();
        let mut session = session.lock().await;
        session
            .execute_command(&sandbox::provisioning::release_script(sandbox_name), None)
            .await?;
        state.store.set_sandbox_name(&task_id, None).await?;
    }

    Ok(response::no_content())
}

#[derive(Debug, Deserialize, Default)]
pub struct TriggerReportRequest {
    pub sdk_version: Option<String>,
    pub operator: Option<String>,
}

/// POST /api/v1/tasks/:task_id/report — runs Report: per-case LLM
/// scoring followed by the `.xlsx` writeup.
pub async fn trigger_report(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(req): Json<TriggerReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.store.try_lock_task(&task_id)?;
    let task = state.store.get_task(&task_id).await?;

    let mut initial = ReportState::new(task.task_id.clone());
    initial.test_requirement = task.requirement_text.clone();
    initial.algorithm_image = task.algorithm_image.clone();
    initial.dataset_location = task.dataset_location.clone().unwrap_or_default();
    initial.sdk_version = req.sdk_version;
    initial.operator = req.operator;

    let graph = CompiledGraph::compile(workflows::report::build(state.gateway.clone(), state.store.clone()))
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let result = graph.run(initial).await;

    Ok(response::ok(serde_json::json!({
        "status": result.status,
        "report_path": result.report_path,
        "errors": result.errors,
    })))
}
