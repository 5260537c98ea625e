//! Row types for the `tasks`, `test_cases`, and `reports` tables.
//!
//! Each row type mirrors its table's `TEXT`-typed status/verdict
//! columns as plain `String`s — `sqlx::FromRow` has no visibility into
//! `domain`'s enums, so conversion to/from [`domain::TaskStatus`] etc.
//! happens one level up, in the repository functions. This is the same
//! split the teacher's `db::models` / `db::repositories` pair uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `tasks` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskRow {
    pub task_id: String,
    pub document_id: Option<String>,
    pub requirement_text: String,
    pub algorithm_image: String,
    pub dataset_location: Option<String>,
    pub sandbox_name: Option<String>,
    pub document_hash: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of the `test_cases` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CaseRow {
    pub case_id: String,
    pub task_id: String,
    pub document_id: Option<String>,
    pub name: String,
    pub purpose: String,
    pub steps: String,
    pub expected_result: String,
    pub validation_method: String,
    pub test_data: Option<String>,
    pub actual_output: Option<String>,
    pub result_analysis: Option<String>,
    pub is_passed: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A row of the `reports` table. At most one per task (§3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportRow {
    pub task_id: String,
    pub summary: String,
    pub total_cases: i64,
    pub passed_cases: i64,
    pub failed_cases: i64,
    pub artifact_path: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to draft a new test case before it has a `case_id`
/// (Analysis synthesizes these; Selection and Execution only update
/// existing rows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCase {
    pub task_id: String,
    pub document_id: Option<String>,
    pub name: String,
    pub purpose: String,
    pub steps: String,
    pub expected_result: String,
    pub validation_method: String,
}
