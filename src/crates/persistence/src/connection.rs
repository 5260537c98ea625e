//! Connection pooling, migrations, and health checks.
//!
//! Grounded on `orchestrator::db::connection::DatabaseConnection` —
//! same pool-wrapper shape, same `run_migrations`/`health_check` pair.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Type alias for the underlying sqlx pool.
pub type DatabasePool = SqlitePool;

/// A cloneable handle to the store's connection pool.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DatabasePool>,
}

impl Database {
    /// Open a connection pool against `database_url`
    /// (e.g. `sqlite:algotest.db` or `sqlite::memory:`).
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect_with_max_connections(database_url, 5).await
    }

    pub async fn connect_with_max_connections(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Apply embedded migrations. Idempotent — safe to call on every
    /// process start.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connects_and_migrates_in_memory() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        db.health_check().await.unwrap();
    }
}
