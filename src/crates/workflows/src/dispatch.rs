//! Runs an LLM-synthesized [`CommandStrategy`] against a sandbox
//! session. Shared by Selection's `list_labels`/`read_contents` nodes
//! and Execution's `execute_command` node — both need to turn a
//! `{tool, parameters}` plan into an actual sandbox call.

use llm_gateway::CommandStrategy;
use sandbox::{ExecutorTransport, Session, ToolResult};

use crate::error::WorkflowError;

pub async fn dispatch_strategy<T: ExecutorTransport>(
    session: &mut Session<T>,
    strategy: &CommandStrategy,
) -> Result<ToolResult, WorkflowError> {
    let working_dir = strategy.parameters.get("working_dir").map(String::as_str);

    let result = match strategy.tool.as_str() {
        "execute_command" => {
            let command = strategy
                .parameters
                .get("command")
                .ok_or_else(|| WorkflowError::MissingParameter("command"))?;
            session.execute_command(command, working_dir).await?
        }
        "execute_script" => {
            let script = strategy
                .parameters
                .get("script")
                .ok_or_else(|| WorkflowError::MissingParameter("script"))?;
            session.execute_script(script, working_dir).await?
        }
        "list_directory" => {
            let directory = strategy
                .parameters
                .get("directory")
                .ok_or_else(|| WorkflowError::MissingParameter("directory"))?;
            let recursive = strategy
                .parameters
                .get("recursive")
                .map(|v| v == "true")
                .unwrap_or(false);
            session.list_directory(directory, recursive).await?
        }
        "read_file" => {
            let file_path = strategy
                .parameters
                .get("file_path")
                .ok_or_else(|| WorkflowError::MissingParameter("file_path"))?;
            session.read_file(file_path).await?
        }
        other => return Err(WorkflowError::UnknownTool(other.to_string())),
    };

    Ok(result)
}
