//! Shared application state, grounded on
//! `orchestrator::api::routes::AppState`'s `{db, broadcast}` shape.

use std::sync::Arc;

use llm_gateway::Gateway;
use persistence::Store;
use sandbox::{Session, WebSocketTransport};
use tokio::sync::Mutex;

/// Opens a fresh sandbox session against the configured executor
/// daemon. A factory rather than a shared `Session` because each
/// Selection/Execution run owns its own session for its own lifetime
/// (§4.6 — one session per run, not per command, and never shared
/// across runs).
#[derive(Clone)]
pub struct SandboxFactory {
    executor_url: String,
}

impl SandboxFactory {
    pub fn new(executor_url: impl Into<String>) -> Self {
        Self { executor_url: executor_url.into() }
    }

    pub fn open_session(&self) -> Arc<Mutex<Session<WebSocketTransport>>> {
        Arc::new(Mutex::new(Session::new(WebSocketTransport::new(self.executor_url.clone()))))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub gateway: Arc<Gateway>,
    pub sandbox_factory: Arc<SandboxFactory>,
    pub data_root: Arc<persistence::DataRoot>,
}
