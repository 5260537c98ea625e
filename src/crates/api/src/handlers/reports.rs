//! Report artifact download.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/v1/tasks/:task_id/report — streams the task's `.xlsx`
/// report back, 404 if Report has not run yet.
pub async fn download_report(State(state): State<AppState>, Path(task_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let report = state
        .store
        .get_report(&task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no report for task {task_id}")))?;

    let bytes = tokio::fs::read(&report.artifact_path)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let file_name = std::path::Path::new(&report.artifact_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("report.xlsx")
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        bytes,
    ))
}
