//! HTTP facade for algotest-rs: uploads a requirement document, runs
//! Analysis, and exposes triggers for Selection, Execution, and Report
//! plus status/report endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

pub use config::Settings;
pub use routes::create_router;
pub use state::{AppState, SandboxFactory};
