//! API route definitions, grounded on
//! `orchestrator::api::routes::create_router`'s route-table shape.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{cases, reports, tasks, workflows};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tasks", post(tasks::upload_document).get(tasks::list_tasks))
        .route("/api/v1/tasks/:task_id", get(tasks::get_task_status).put(tasks::update_task))
        .route("/api/v1/tasks/:task_id/prepare", post(workflows::trigger_prepare))
        .route("/api/v1/tasks/:task_id/execute", post(workflows::trigger_execute))
        .route("/api/v1/tasks/:task_id/cases/:case_id/execute", post(workflows::execute_case))
        .route("/api/v1/tasks/:task_id/release", post(workflows::trigger_release))
        .route("/api/v1/tasks/:task_id/report", post(workflows::trigger_report).get(reports::download_report))
        .route("/api/v1/cases/:case_id/test-data", put(cases::set_case_test_data))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
