//! Remote sandbox controller for algotest-rs.
//!
//! One [`session::Session`] is provisioned per Execution run and
//! reused for every command the run issues against the algorithm
//! container, rather than reprovisioning per command.

pub mod error;
pub mod provisioning;
pub mod session;
pub mod transport;
pub mod ws;

pub use error::{Result, SandboxError};
pub use session::Session;
pub use transport::{ExecutorTransport, ToolResult};
pub use ws::WebSocketTransport;
