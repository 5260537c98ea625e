//! Zhipu AI-backed LLM gateway for algotest-rs.
//!
//! One [`Gateway`] method per call site the workflows need, all routed
//! through a shared retry/backoff and JSON-extraction pipeline.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod retry;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::{AnalysisVerdict, CommandStrategy, Gateway};
