//! Test case repository.

use chrono::Utc;
use domain::{CaseStatus, Verdict};
use sqlx::SqlitePool;

use crate::models::{CaseRow, NewCase};

pub struct CaseRepository;

impl CaseRepository {
    /// Insert a single case with a caller-supplied id. Creating a case
    /// with an already-used `case_id` is an error (§4.8 Idempotence).
    pub async fn create(
        pool: &SqlitePool,
        case_id: &str,
        new_case: &NewCase,
    ) -> Result<CaseRow, sqlx::Error> {
        sqlx::query_as::<_, CaseRow>(
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
        .fetch_one(pool)
        .await
    }

    pub async fn get(pool: &SqlitePool, case_id: &str) -> Result<Option<CaseRow>, sqlx::Error> {
        sqlx::query_as::<_, CaseRow>("SELECT * FROM test_cases WHERE case_id = ?")
            .bind(case_id)
            .fetch_optional(pool)
            .await
    }

    /// All cases owned by a task, in creation order (P2 ordering relies
    /// on this being a stable, deterministic order).
    pub async fn list_by_task(pool: &SqlitePool, task_id: &str) -> Result<Vec<CaseRow>, sqlx::Error> {
        sqlx::query_as::<_, CaseRow>(
            "SELECT * FROM test_cases WHERE task_id = ? ORDER BY created_at ASC, case_id ASC",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_test_data(
        pool: &SqlitePool,
        case_id: &str,
        test_data: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE test_cases SET test_data = ? WHERE case_id = ?")
            .bind(test_data)
            .bind(case_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_status(
        pool: &SqlitePool,
        case_id: &str,
        status: CaseStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE test_cases SET status = ? WHERE case_id = ?")
            .bind(status.as_str())
            .bind(case_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record an execution or analysis result. `actual_output` and
    /// `result_analysis` are full text — §4.4 forbids truncation (P5).
    #[allow(clippy::too_many_arguments)]
    pub async fn save_result(
        pool: &SqlitePool,
        case_id: &str,
        actual_output: &str,
        result_analysis: &str,
        is_passed: Verdict,
        status: CaseStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE test_cases
             SET actual_output = ?, result_analysis = ?, is_passed = ?, status = ?
             WHERE case_id = ?",
        )
        .bind(actual_output)
        .bind(result_analysis)
        .bind(is_passed.as_str())
        .bind(status.as_str())
        .bind(case_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::repositories::task_repo::TaskRepository;

    async fn seeded_task() -> (Database, String) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        TaskRepository::create(db.pool(), "TASK1", "r", "img", None, None, None)
            .await
            .unwrap();
        (db, "TASK1".to_string())
    }

    fn case(task_id: &str) -> NewCase {
        NewCase {
            task_id: task_id.to_string(),
            document_id: None,
            name: "detect objects".to_string(),
            purpose: "check detection accuracy".to_string(),
            steps: "run detection on sample".to_string(),
            expected_result: "target_count >= 0".to_string(),
            validation_method: "field presence".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_case_owned_by_task() {
        let (db, task_id) = seeded_task().await;
        let row = CaseRepository::create(db.pool(), "TC1", &case(&task_id)).await.unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(row.is_passed, "unknown");
    }

    #[tokio::test]
    async fn duplicate_case_id_is_an_error() {
        let (db, task_id) = seeded_task().await;
        CaseRepository::create(db.pool(), "TC1", &case(&task_id)).await.unwrap();
        let result = CaseRepository::create(db.pool(), "TC1", &case(&task_id)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_by_task_preserves_insertion_order() {
        let (db, task_id) = seeded_task().await;
        CaseRepository::create(db.pool(), "TC1", &case(&task_id)).await.unwrap();
        CaseRepository::create(db.pool(), "TC2", &case(&task_id)).await.unwrap();

        let cases = CaseRepository::list_by_task(db.pool(), &task_id).await.unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_id, "TC1");
        assert_eq!(cases[1].case_id, "TC2");
    }

    #[tokio::test]
    async fn save_result_preserves_full_output() {
        let (db, task_id) = seeded_task().await;
        CaseRepository::create(db.pool(), "TC1", &case(&task_id)).await.unwrap();

        let output = "x".repeat(10_000);
        CaseRepository::save_result(
            db.pool(),
            "TC1",
            &output,
            "passed, 120ms",
            Verdict::Pass,
            CaseStatus::Completed,
        )
        .await
        .unwrap();

        let row = CaseRepository::get(db.pool(), "TC1").await.unwrap().unwrap();
        assert_eq!(row.actual_output.as_deref(), Some(output.as_str()));
        assert_eq!(row.is_passed, "pass");
    }
}
