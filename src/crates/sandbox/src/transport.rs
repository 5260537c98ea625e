//! `ExecutorTransport` — the thin trait a [`crate::session::Session`]
//! drives. Grounded on `aco::client`'s session-handshake-over-a-
//! persistent-connection shape, simplified to the two calls this
//! system actually needs: `initialize` once, then repeated
//! `call_tool`.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Raw result of one `call_tool` invocation, before `Session` applies
/// the `命令执行成功:`/`命令执行失败:` framing strip and the `isError`
/// override heuristic.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub stdout: String,
    pub stderr: String,
    pub is_error: bool,
}

/// Implemented once per wire protocol (production: [`crate::ws::WebSocketTransport`];
/// tests: an in-memory recording mock, see `session`'s test module).
#[async_trait]
pub trait ExecutorTransport: Send + Sync {
    async fn initialize(&mut self) -> Result<()>;
    async fn call_tool(&mut self, name: &str, params: Value) -> Result<ToolResult>;
}
