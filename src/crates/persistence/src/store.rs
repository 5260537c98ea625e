//! `Store` — the facade workflow nodes and the HTTP façade use.
//!
//! Wraps the per-aggregate repositories with the two cross-cutting
//! concerns the spec calls out: atomic multi-row writes (§4.8
//! Transactions) and a single-active-workflow-per-task advisory lock
//! (the Open Question decision recorded in SPEC_FULL.md §9 — this repo
//! serializes rather than racing last-writer-wins).

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Utc;
use domain::{CaseStatus, TaskStatus, Verdict};
use sha2::{Digest, Sha256};
use sqlx::Sqlite;

use crate::connection::Database;
use crate::error::{Result, StoreError};
use crate::models::{CaseRow, NewCase, ReportRow, TaskRow};
use crate::repositories::{CaseRepository, ReportRepository, TaskRepository};

pub struct Store {
    db: Database,
    /// Task ids with a workflow currently running against them.
    locked_tasks: Mutex<HashSet<String>>,
}

/// RAII guard releasing a task lock when a workflow run finishes,
/// successfully or not.
pub struct TaskLockGuard<'a> {
    store: &'a Store,
    task_id: String,
}

impl Drop for TaskLockGuard<'_> {
    fn drop(&mut self) {
        self.store.locked_tasks.lock().unwrap().remove(&self.task_id);
    }
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            locked_tasks: Mutex::new(HashSet::new()),
        }
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.db.pool()
    }

    /// Acquire the advisory per-task lock. Returns `StoreError::TaskLocked`
    /// if another workflow is already running for this task — see §5
    /// Shared state and the concurrency Open Question.
    pub fn try_lock_task(&self, task_id: &str) -> Result<TaskLockGuard<'_>> {
        let mut locked = self.locked_tasks.lock().unwrap();
        if !locked.insert(task_id.to_string()) {
            return Err(StoreError::TaskLocked(task_id.to_string()));
        }
        Ok(TaskLockGuard {
            store: self,
            task_id: task_id.to_string(),
        })
    }

    /// Upload dedup (P4, I4): hash the document bytes; if a task with
    /// that hash already exists, return it unchanged; otherwise create
    /// a fresh task.
    pub async fn upload_document(
        &self,
        task_id: &str,
        requirement_text: &str,
        algorithm_image: &str,
        document_id: Option<&str>,
        dataset_location: Option<&str>,
        bytes: &[u8],
    ) -> Result<TaskRow> {
        let hash = hex::encode(Sha256::digest(bytes));

        if let Some(existing) = TaskRepository::find_by_document_hash(self.pool(), &hash).await? {
            return Ok(existing);
        }

        let row = TaskRepository::create(
            self.pool(),
            task_id,
            requirement_text,
            algorithm_image,
            document_id,
            dataset_location,
            Some(&hash),
        )
        .await?;
        Ok(row)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskRow> {
        TaskRepository::get(self.pool(), task_id)
            .await?
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        Ok(TaskRepository::list(self.pool()).await?)
    }

    pub async fn set_task_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        TaskRepository::set_status(self.pool(), task_id, status).await?;
        Ok(())
    }

    pub async fn set_sandbox_name(&self, task_id: &str, sandbox_name: Option<&str>) -> Result<()> {
        TaskRepository::set_sandbox_name(self.pool(), task_id, sandbox_name).await?;
        Ok(())
    }

    pub async fn set_algorithm_image(&self, task_id: &str, algorithm_image: &str) -> Result<()> {
        TaskRepository::set_algorithm_image(self.pool(), task_id, algorithm_image).await?;
        Ok(())
    }

    pub async fn set_dataset_location(&self, task_id: &str, dataset_location: &str) -> Result<()> {
        TaskRepository::set_dataset_location(self.pool(), task_id, dataset_location).await?;
        Ok(())
    }

    pub async fn list_cases(&self, task_id: &str) -> Result<Vec<CaseRow>> {
        Ok(CaseRepository::list_by_task(self.pool(), task_id).await?)
    }

    pub async fn get_case(&self, case_id: &str) -> Result<CaseRow> {
        CaseRepository::get(self.pool(), case_id)
            .await?
            .ok_or_else(|| StoreError::CaseNotFound(case_id.to_string()))
    }

    pub async fn set_case_test_data(&self, case_id: &str, test_data: &str) -> Result<()> {
        CaseRepository::set_test_data(self.pool(), case_id, test_data).await?;
        Ok(())
    }

    pub async fn set_case_status(&self, case_id: &str, status: CaseStatus) -> Result<()> {
        CaseRepository::set_status(self.pool(), case_id, status).await?;
        Ok(())
    }

    pub async fn save_case_result(
        &self,
        case_id: &str,
        actual_output: &str,
        result_analysis: &str,
        is_passed: Verdict,
        status: CaseStatus,
    ) -> Result<()> {
        CaseRepository::save_result(self.pool(), case_id, actual_output, result_analysis, is_passed, status)
            .await?;
        Ok(())
    }

    /// Analysis's persist node (§4.2 step 3): upsert the task and
    /// insert every synthesized case in one transaction. Any write
    /// failure rolls the whole batch back.
    pub async fn save_analysis(
        &self,
        task_id: &str,
        requirement_text: &str,
        algorithm_image: &str,
        cases: &[(String, NewCase)],
    ) -> Result<Vec<CaseRow>> {
        let mut tx = self.db.pool().begin().await?;

        let existing = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_none() {
            let now = Utc::now();
            sqlx::query(
                "INSERT INTO tasks
                    (task_id, document_id, requirement_text, algorithm_image,
                     dataset_location, sandbox_name, document_hash, status,
                     created_at, updated_at)
                 VALUES (?, NULL, ?, ?, NULL, NULL, NULL, ?, ?, ?)",
            )
            .bind(task_id)
            .bind(requirement_text)
            .bind(algorithm_image)
            .bind(TaskStatus::Created.as_str())
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let mut inserted = Vec::with_capacity(cases.len());
        for (case_id, new_case) in cases {
            let row = sqlx::query_as::<_, CaseRow>(
                "INSERT INTO test_cases
                    (case_id, task_id, document_id, name, purpose, steps,
                     expected_result, validation_method, test_data, actual_output,
                     result_analysis, is_passed, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?, ?)
                 RETURNING *",
            )
            .bind(case_id)
            .bind(&new_case.task_id)
            .bind(&new_case.document_id)
            .bind(&new_case.name)
            .bind(&new_case.purpose)
            .bind(&new_case.steps)
            .bind(&new_case.expected_result)
            .bind(&new_case.validation_method)
            .bind(Verdict::Unknown.as_str())
            .bind(CaseStatus::Pending.as_str())
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn save_report(
        &self,
        task_id: &str,
        summary: &str,
        total_cases: i64,
        passed_cases: i64,
        failed_cases: i64,
        artifact_path: &str,
    ) -> Result<ReportRow> {
        Ok(ReportRepository::upsert(
            self.pool(),
            task_id,
            summary,
            total_cases,
            passed_cases,
            failed_cases,
            artifact_path,
        )
        .await?)
    }

    pub async fn get_report(&self, task_id: &str) -> Result<Option<ReportRow>> {
        Ok(ReportRepository::get(self.pool(), task_id).await?)
    }
}

/// sqlx's sqlite transaction type, spelled out once for readability at
/// call sites that need to thread a transaction through more than one
/// repository call (none do yet, kept for the next one that will).
pub type Tx<'a> = sqlx::Transaction<'a, Sqlite>;

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCase;

    async fn store() -> Store {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        Store::new(db)
    }

    #[tokio::test]
    async fn upload_dedup_returns_existing_task() {
        let store = store().await;
        let bytes = b"pdf bytes";

        let first = store
            .upload_document("TASK1", "req", "img", None, None, bytes)
            .await
            .unwrap();
        let second = store
            .upload_document("TASK2", "req", "img", None, None, bytes)
            .await
            .unwrap();

        assert_eq!(first.task_id, second.task_id);
        assert_eq!(store.list_tasks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn task_lock_rejects_concurrent_acquire() {
        let store = store().await;
        let _guard = store.try_lock_task("TASK1").unwrap();
        assert!(store.try_lock_task("TASK1").is_err());
    }

    #[tokio::test]
    async fn task_lock_releases_on_drop() {
        let store = store().await;
        {
            let _guard = store.try_lock_task("TASK1").unwrap();
        }
        assert!(store.try_lock_task("TASK1").is_ok());
    }

    #[tokio::test]
    async fn save_analysis_upserts_task_and_inserts_cases_atomically() {
        let store = store().await;
        let cases = vec![(
            "TC1".to_string(),
            NewCase {
                task_id: "TASK1".to_string(),
                document_id: None,
                name: "case 1".to_string(),
                purpose: "p".to_string(),
                steps: "s".to_string(),
                expected_result: "e".to_string(),
                validation_method: "v".to_string(),
            },
        )];

        let inserted = store.save_analysis("TASK1", "req", "img", &cases).await.unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(store.list_cases("TASK1").await.unwrap().len(), 1);
    }
}
