//! Persistence-layer error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("case not found: {0}")]
    CaseNotFound(String),

    #[error("case id already exists: {0}")]
    DuplicateCaseId(String),

    #[error("a workflow is already running for task {0}")]
    TaskLocked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
