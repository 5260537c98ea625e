//! Production [`ExecutorTransport`] over a persistent WebSocket
//! connection. Grounded on `orchestrator::executor::streaming`'s
//! sequence-numbered update channel (sequence numbers here correlate
//! a `call_tool` request with its response instead of ordering a
//! token stream) and `aco::client`'s connect-once-then-call shape.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Result, SandboxError};
use crate::transport::{ExecutorTransport, ToolResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Talks to the remote executor daemon over `ws://` or `wss://`. One
/// instance per [`crate::session::Session`], opened once in
/// `initialize` and reused for every `call_tool`.
pub struct WebSocketTransport {
    url: String,
    stream: Option<WsStream>,
    sequence: AtomicU64,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ExecutorTransport for WebSocketTransport {
    async fn initialize(&mut self) -> Result<()> {
        let (stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| SandboxError::Transport(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn call_tool(&mut self, name: &str, params: Value) -> Result<ToolResult> {
        let stream = self.stream.as_mut().ok_or(SandboxError::NotInitialized)?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let request = json!({ "sequence": sequence, "tool": name, "params": params });
        stream
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|e| SandboxError::Transport(e.to_string()))?;

        while let Some(message) = stream.next().await {
            let message = message.map_err(|e| SandboxError::Transport(e.to_string()))?;
            let Message::Text(text) = message else { continue };

            let value: Value = serde_json::from_str(&text).map_err(|e| SandboxError::Transport(e.to_string()))?;
            if value.get("sequence").and_then(Value::as_u64) != Some(sequence) {
                continue;
            }

            return Ok(ToolResult {
                stdout: value["stdout"].as_str().unwrap_or_default().to_string(),
                stderr: value["stderr"].as_str().unwrap_or_default().to_string(),
                is_error: value["isError"].as_bool().unwrap_or(false),
            });
        }

        Err(SandboxError::Transport("connection closed before a response arrived".to_string()))
    }
}
