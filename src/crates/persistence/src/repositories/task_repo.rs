//! Task repository.
//!
//! Grounded on `orchestrator::db::repositories::task_repo::TaskRepository`
//! (bind-and-`RETURNING *`, `fetch_optional` for lookups).

use chrono::Utc;
use domain::TaskStatus;
use sqlx::SqlitePool;

use crate::models::TaskRow;

pub struct TaskRepository;

impl TaskRepository {
    pub async fn create(
        pool: &SqlitePool,
        task_id: &str,
        requirement_text: &str,
        algorithm_image: &str,
        document_id: Option<&str>,
        dataset_location: Option<&str>,
        document_hash: Option<&str>,
    ) -> Result<TaskRow, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, TaskRow>(
            "INSERT INTO tasks
                (task_id, document_id, requirement_text, algorithm_image,
                 dataset_location, sandbox_name, document_hash, status,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(task_id)
        .bind(document_id)
        .bind(requirement_text)
        .bind(algorithm_image)
        .bind(dataset_location)
        .bind(document_hash)
        .bind(TaskStatus::Created.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn get(pool: &SqlitePool, task_id: &str) -> Result<Option<TaskRow>, sqlx::Error> {
        sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_document_hash(
        pool: &SqlitePool,
        document_hash: &str,
    ) -> Result<Option<TaskRow>, sqlx::Error> {
        sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE document_hash = ?")
            .bind(document_hash)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<TaskRow>, sqlx::Error> {
        sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks ORDER BY created_at DESC")
            .fetch_all(pool)
            .await
    }

    /// Update status. Safe to repeat (idempotent — §4.8).
    pub async fn set_status(
        pool: &SqlitePool,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE task_id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set the sandbox name (§4.4 provisioning) or clear it (release).
    pub async fn set_sandbox_name(
        pool: &SqlitePool,
        task_id: &str,
        sandbox_name: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET sandbox_name = ?, updated_at = ? WHERE task_id = ?")
            .bind(sandbox_name)
            .bind(Utc::now())
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_algorithm_image(
        pool: &SqlitePool,
        task_id: &str,
        algorithm_image: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET algorithm_image = ?, updated_at = ? WHERE task_id = ?")
            .bind(algorithm_image)
            .bind(Utc::now())
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_dataset_location(
        pool: &SqlitePool,
        task_id: &str,
        dataset_location: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET dataset_location = ?, updated_at = ? WHERE task_id = ?")
            .bind(dataset_location)
            .bind(Utc::now())
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    async fn db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    #[tokio::test]
    async fn creates_and_fetches_task() {
        let db = db().await;
        let row = TaskRepository::create(db.pool(), "TASK1", "do the thing", "img:v1", None, None, None)
            .await
            .unwrap();
        assert_eq!(row.status, "created");

        let fetched = TaskRepository::get(db.pool(), "TASK1").await.unwrap().unwrap();
        assert_eq!(fetched.task_id, "TASK1");
    }

    #[tokio::test]
    async fn dedups_by_document_hash() {
        let db = db().await;
        TaskRepository::create(db.pool(), "TASK1", "r", "img", None, None, Some("hash-a"))
            .await
            .unwrap();

        let found = TaskRepository::find_by_document_hash(db.pool(), "hash-a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.task_id, "TASK1");
    }

    #[tokio::test]
    async fn sandbox_name_lifecycle() {
        let db = db().await;
        TaskRepository::create(db.pool(), "TASK1", "r", "img", None, None, None)
            .await
            .unwrap();

        TaskRepository::set_sandbox_name(db.pool(), "TASK1", Some("algotest_TASK1"))
            .await
            .unwrap();
        let row = TaskRepository::get(db.pool(), "TASK1").await.unwrap().unwrap();
        assert_eq!(row.sandbox_name.as_deref(), Some("algotest_TASK1"));

        TaskRepository::set_sandbox_name(db.pool(), "TASK1", None).await.unwrap();
        let row = TaskRepository::get(db.pool(), "TASK1").await.unwrap().unwrap();
        assert_eq!(row.sandbox_name, None);
    }
}
