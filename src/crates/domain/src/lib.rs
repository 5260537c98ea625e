//! Identifiers, timestamps, and shared status enums.
//!
//! This crate has no dependency on persistence, the LLM gateway, or the
//! sandbox controller — it sits at the bottom of the dependency order
//! described in the system overview and is safe for every other crate
//! in the workspace to depend on.

pub mod id;
pub mod status;
pub mod time;

pub use id::{CaseId, DocumentId, Id, IdPrefix, ReportId, TaskId};
pub use status::{CaseStatus, TaskStatus, Verdict};
pub use time::now_utc;
