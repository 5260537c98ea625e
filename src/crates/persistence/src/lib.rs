//! Storage for algotest-rs: sqlx/SQLite repositories for tasks, test
//! cases, and reports, plus the filesystem layout for uploaded
//! documents and generated artifacts.

pub mod connection;
pub mod error;
pub mod layout;
pub mod models;
pub mod repositories;
pub mod store;

pub use connection::{Database, DatabasePool};
pub use error::{Result, StoreError};
pub use layout::DataRoot;
pub use models::{CaseRow, NewCase, ReportRow, TaskRow};
pub use repositories::{CaseRepository, ReportRepository, TaskRepository};
pub use store::{Store, TaskLockGuard};
