//! Per-case endpoint handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetCaseTestDataRequest {
    pub test_data: String,
}

/// PUT /api/v1/cases/:case_id/test-data — Selection normally sets this
/// itself; exposed for manual correction of its image mapping.
pub async fn set_case_test_data(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Json(req): Json<SetCaseTestDataRequest>,
) -> ApiResult<impl IntoResponse> {
    state.store.set_case_test_data(&case_id, &req.test_data).await?;
    let case = state.store.get_case(&case_id).await?;
    Ok(response::ok(case))
}
