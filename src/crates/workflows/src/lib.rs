//! The four algotest-rs workflows, each a [`workflow_core::Graph`] over
//! its own state type: Analysis, Selection, Execution, Report.

pub mod analysis;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod report;
pub mod selection;

pub use workflow_core::Cancellable;
