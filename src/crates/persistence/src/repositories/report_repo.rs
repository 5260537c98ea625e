//! Report repository. At most one report row per task (§3).

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::ReportRow;

pub struct ReportRepository;

impl ReportRepository {
    /// Insert or replace the report for a task — a second Report run
    /// overwrites the first rather than erroring, matching the
    /// final-writer-wins idempotence rule (§4.8).
    pub async fn upsert(
        pool: &SqlitePool,
        task_id: &str,
        summary: &str,
        total_cases: i64,
        passed_cases: i64,
        failed_cases: i64,
        artifact_path: &str,
    ) -> Result<ReportRow, sqlx::Error> {
        sqlx::query_as::<_, ReportRow>(
            "INSERT INTO reports
                (task_id, summary, total_cases, passed_cases, failed_cases, artifact_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(task_id) DO UPDATE SET
                summary = excluded.summary,
                total_cases = excluded.total_cases,
                passed_cases = excluded.passed_cases,
                failed_cases = excluded.failed_cases,
                artifact_path = excluded.artifact_path,
                created_at = excluded.created_at
             RETURNING *",
        )
        .bind(task_id)
        .bind(summary)
        .bind(total_cases)
        .bind(passed_cases)
        .bind(failed_cases)
        .bind(artifact_path)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn get(pool: &SqlitePool, task_id: &str) -> Result<Option<ReportRow>, sqlx::Error> {
        sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::repositories::task_repo::TaskRepository;

    #[tokio::test]
    async fn upsert_overwrites_prior_report() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        TaskRepository::create(db.pool(), "TASK1", "r", "img", None, None, None)
            .await
            .unwrap();

        ReportRepository::upsert(db.pool(), "TASK1", "first", 3, 2, 1, "data/report/a.xlsx")
            .await
            .unwrap();
        ReportRepository::upsert(db.pool(), "TASK1", "second", 3, 3, 0, "data/report/b.xlsx")
            .await
            .unwrap();

        let row = ReportRepository::get(db.pool(), "TASK1").await.unwrap().unwrap();
        assert_eq!(row.summary, "second");
        assert_eq!(row.passed_cases, 3);
    }
}
