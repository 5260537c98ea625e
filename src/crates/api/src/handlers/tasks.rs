//! Task endpoint handlers: upload (which also kicks off Analysis),
//! listing, updating the image/dataset, and fetching status with
//! per-case details.

use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use axum::Json;
use domain::{DocumentId, TaskId};
use serde::{Deserialize, Serialize};
use workflow_core::CompiledGraph;
use workflows::analysis::AnalysisState;

use crate::error::{ApiError, ApiResult};
use crate::response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task: persistence::TaskRow,
    pub cases_synthesized: usize,
    pub analysis_status: String,
    pub errors: Vec<String>,
}

/// POST /api/v1/tasks — multipart fields: `file`, `requirement_text`,
/// `algorithm_image`, optionally `dataset_location`. Stores the
/// document (deduped by content hash, §4.8 I4), then runs Analysis to
/// completion before responding.
pub async fn upload_document(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name = "requirements.pdf".to_string();
    let mut requirement_text = String::new();
    let mut algorithm_image = String::new();
    let mut dataset_location: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.to_string()))? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or("requirements.pdf").to_string();
                let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
                file_bytes = Some(bytes.to_vec());
            }
            "requirement_text" => {
                requirement_text = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "algorithm_image" => {
                algorithm_image = field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            "dataset_location" => {
                dataset_location = Some(field.text().await.map_err(|e| ApiError::BadRequest(e.to_string()))?);
            }
            _ => {}
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError::ValidationError("missing \"file\" field".to_string()))?;
    if requirement_text.is_empty() || algorithm_image.is_empty() {
        return Err(ApiError::ValidationError(
            "\"requirement_text\" and \"algorithm_image\" are required".to_string(),
        ));
    }

    let task_id = TaskId::new();
    let document_id = DocumentId::new();

    let pdf_path = state.data_root.pdf_path(document_id.as_str(), &file_name)?;
    tokio::fs::write(&pdf_path, &bytes).await.map_err(|e| ApiError::InternalError(e.to_string()))?;

    let task = state
        .store
        .upload_document(
            task_id.as_str(),
            &requirement_text,
            &algorithm_image,
            Some(document_id.as_str()),
            dataset_location.as_deref(),
            &bytes,
        )
        .await?;

    let graph = CompiledGraph::compile(workflows::analysis::build(state.gateway.clone(), state.store.clone()))
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let initial = AnalysisState::new(
        task.task_id.clone(),
        pdf_path.to_string_lossy().to_string(),
        task.requirement_text.clone(),
        task.algorithm_image.clone(),
    );
    let result = graph.run(initial).await;
    let cases_synthesized = result.test_cases.as_ref().map(Vec::len).unwrap_or(0);

    Ok(response::created(UploadResponse {
        task,
        cases_synthesized,
        analysis_status: result.status,
        errors: result.errors,
    }))
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let tasks = state.store.list_tasks().await?;
    Ok(response::ok(tasks))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub algorithm_image: Option<String>,
    pub dataset_location: Option<String>,
}

/// PUT /api/v1/tasks/:task_id — updates whichever of the two fields
/// is present; neither is required.
pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(image) = &req.algorithm_image {
        state.store.set_algorithm_image(&task_id, image).await?;
    }
    if let Some(location) = &req.dataset_location {
        state.store.set_dataset_location(&task_id, location).await?;
    }
    let task = state.store.get_task(&task_id).await?;
    Ok(response::ok(task))
}

#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    pub task: persistence::TaskRow,
    pub cases: Vec<persistence::CaseRow>,
}

/// GET /api/v1/tasks/:task_id — task row plus every case's current
/// state, the shape a polling UI needs.
pub async fn get_task_status(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let task = state.store.get_task(&task_id).await?;
    let cases = state.store.list_cases(&task_id).await?;
    Ok(response::ok(TaskStatusResponse { task, cases }))
}
