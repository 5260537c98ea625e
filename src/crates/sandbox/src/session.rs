//! `Session` — one long-lived sandbox per Execution run (never one per
//! command, per the redesign: the original reprovisioned a container
//! for nearly every tool call).

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Result, SandboxError};
use crate::provisioning::{provisioning_script, release_script, verification_script};
use crate::transport::{ExecutorTransport, ToolResult};

/// Stdout substrings that mean "this call actually failed" even when
/// the transport itself reported success. Carried from
/// `execution_agent.py`'s own heuristic, which distrusts the executor
/// daemon's exit-code plumbing.
const ERROR_KEYWORDS: &[&str] = &["脚本执行失败", "返回码:", "错误:", "Error:", "Failed:"];

/// Working-directory spellings the model uses interchangeably to mean
/// "sandbox root".
const CWD_ALIASES: &[&str] = &["current_directory", ".", "current", "current dir"];

pub struct Session<T: ExecutorTransport> {
    transport: T,
    initialized: bool,
    sandbox_name: Option<String>,
}

impl<T: ExecutorTransport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            initialized: false,
            sandbox_name: None,
        }
    }

    pub fn sandbox_name(&self) -> Option<&str> {
        self.sandbox_name.as_deref()
    }

    async fn ensure_initialized(&mut self) -> Result<()> {
        if !self.initialized {
            self.transport.initialize().await?;
            self.initialized = true;
        }
        Ok(())
    }

    /// Starts the algorithm container and waits for the `docker
    /// inspect` probe to confirm it is running. Leaves `sandbox_name`
    /// set only once provisioning is verified.
    pub async fn provision(
        &mut self,
        sandbox_name: &str,
        image: &str,
        dataset_location: Option<&str>,
    ) -> Result<()> {
        self.ensure_initialized().await?;

        let script = provisioning_script(sandbox_name, image, dataset_location);
        self.raw_execute_command(&script, None).await?;

        let check = self.raw_execute_command(&verification_script(sandbox_name), None).await?;
        if !check.stdout.contains("true") {
            return Err(SandboxError::ToolFailed(
                "provision".to_string(),
                format!("container {sandbox_name} did not reach the running state"),
            ));
        }

        self.sandbox_name = Some(sandbox_name.to_string());
        Ok(())
    }

    /// Tears the container down and verifies it is actually gone,
    /// mirroring `provision`'s verify-then-commit shape. Idempotent: a
    /// session with no provisioned sandbox releases cleanly as a no-op.
    pub async fn release(&mut self) -> Result<()> {
        let Some(sandbox_name) = self.sandbox_name.take() else {
            debug!("release called with no sandbox provisioned, skipping");
            return Ok(());
        };
        self.raw_execute_command(&release_script(&sandbox_name), None).await?;

        let check = self.raw_execute_command(&verification_script(&sandbox_name), None).await?;
        if check.stdout.contains("true") {
            self.sandbox_name = Some(sandbox_name.clone());
            return Err(SandboxError::ToolFailed(
                "release".to_string(),
                format!("container {sandbox_name} is still running after release"),
            ));
        }

        Ok(())
    }

    pub async fn execute_command(&mut self, command: &str, working_dir: Option<&str>) -> Result<ToolResult> {
        let (command, working_dir) = preprocess_command(command, working_dir);
        self.raw_execute_command(&command, working_dir.as_deref()).await
    }

    pub async fn execute_script(&mut self, script: &str, working_dir: Option<&str>) -> Result<ToolResult> {
        let (script, working_dir) = preprocess_command(script, working_dir);
        self.ensure_initialized().await?;
        let params = build_params(&script, working_dir.as_deref());
        let raw = self.transport.call_tool("execute_script", params).await?;
        Ok(parse_tool_result(raw))
    }

    pub async fn list_directory(&mut self, directory: &str, recursive: bool) -> Result<ToolResult> {
        self.ensure_initialized().await?;
        let raw = self
            .transport
            .call_tool(
                "list_directory",
                serde_json::json!({ "directory": directory, "recursive": recursive }),
            )
            .await?;
        Ok(parse_tool_result(raw))
    }

    pub async fn read_file(&mut self, file_path: &str) -> Result<ToolResult> {
        self.ensure_initialized().await?;
        let raw = self
            .transport
            .call_tool("read_file", serde_json::json!({ "file_path": file_path }))
            .await?;
        Ok(parse_tool_result(raw))
    }

    async fn raw_execute_command(&mut self, command: &str, working_dir: Option<&str>) -> Result<ToolResult> {
        self.ensure_initialized().await?;
        let params = build_params(command, working_dir);
        let raw = self.transport.call_tool("execute_command", params).await?;
        Ok(parse_tool_result(raw))
    }
}

fn build_params(command: &str, working_dir: Option<&str>) -> serde_json::Value {
    let mut map = HashMap::new();
    map.insert("command".to_string(), command.to_string());
    if let Some(dir) = working_dir {
        map.insert("working_dir".to_string(), dir.to_string());
    }
    serde_json::to_value(map).unwrap_or(serde_json::Value::Null)
}

/// Rewrites the working-dir alias and strips a leading `sudo `, the
/// two normalizations `MCPClient.execute_strategy` applied to every
/// command before dispatch.
fn preprocess_command(command: &str, working_dir: Option<&str>) -> (String, Option<String>) {
    let command = strip_sudo(command);
    let working_dir = working_dir.map(normalize_working_dir);
    (command, working_dir)
}

fn strip_sudo(command: &str) -> String {
    command.strip_prefix("sudo ").unwrap_or(command).to_string()
}

fn normalize_working_dir(working_dir: &str) -> String {
    if CWD_ALIASES.contains(&working_dir) {
        "/".to_string()
    } else {
        working_dir.to_string()
    }
}

/// Strips the `命令执行成功:`/`命令执行失败:` framing the executor
/// prepends, then applies the stdout-keyword override: the transport's
/// `is_error` flag is trusted unless the stdout text itself contains
/// one of [`ERROR_KEYWORDS`], in which case the call is treated as
/// failed regardless of what the transport reported.
fn parse_tool_result(mut result: ToolResult) -> ToolResult {
    for prefix in ["命令执行成功:", "命令执行失败:"] {
        if let Some(rest) = result.stdout.strip_prefix(prefix) {
            result.stdout = rest.trim_start().to_string();
        }
    }

    if !result.is_error && ERROR_KEYWORDS.iter().any(|kw| result.stdout.contains(kw)) {
        warn!("overriding is_error=false: stdout contains an error keyword");
        result.is_error = true;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingTransport {
        calls: Mutex<Vec<(String, serde_json::Value)>>,
        responses: Mutex<Vec<ToolResult>>,
    }

    impl RecordingTransport {
        fn with_responses(responses: Vec<ToolResult>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl ExecutorTransport for RecordingTransport {
        async fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        async fn call_tool(&mut self, name: &str, params: serde_json::Value) -> Result<ToolResult> {
            self.calls.lock().unwrap().push((name.to_string(), params));
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(ToolResult { stdout: String::new(), stderr: String::new(), is_error: false })
            } else {
                Ok(responses.remove(0))
            }
        }
    }

    fn ok_result(stdout: &str) -> ToolResult {
        ToolResult { stdout: stdout.to_string(), stderr: String::new(), is_error: false }
    }

    #[tokio::test]
    async fn provision_sets_sandbox_name_only_after_verification_passes() {
        let transport = RecordingTransport::with_responses(vec![
            ok_result("started"),
            ok_result("true"),
        ]);
        let mut session = Session::new(transport);
        session.provision("sbx-1", "algo:latest", None).await.unwrap();
        assert_eq!(session.sandbox_name(), Some("sbx-1"));
    }

    #[tokio::test]
    async fn provision_fails_when_verification_does_not_report_running() {
        let transport = RecordingTransport::with_responses(vec![
            ok_result("started"),
            ok_result("false"),
        ]);
        let mut session = Session::new(transport);
        let result = session.provision("sbx-1", "algo:latest", None).await;
        assert!(result.is_err());
        assert_eq!(session.sandbox_name(), None);
    }

    #[tokio::test]
    async fn release_clears_sandbox_name_once_absence_is_verified() {
        let transport = RecordingTransport::with_responses(vec![
            ok_result("started"),
            ok_result("true"),
            ok_result("stopped"),
            ok_result("false"),
        ]);
        let mut session = Session::new(transport);
        session.provision("sbx-1", "algo:latest", None).await.unwrap();
        session.release().await.unwrap();
        assert_eq!(session.sandbox_name(), None);
    }

    #[tokio::test]
    async fn release_fails_and_restores_sandbox_name_if_still_running() {
        let transport = RecordingTransport::with_responses(vec![
            ok_result("started"),
            ok_result("true"),
            ok_result("stopped"),
            ok_result("true"),
        ]);
        let mut session = Session::new(transport);
        session.provision("sbx-1", "algo:latest", None).await.unwrap();
        let result = session.release().await;
        assert!(result.is_err());
        assert_eq!(session.sandbox_name(), Some("sbx-1"));
    }

    #[tokio::test]
    async fn release_without_a_provisioned_sandbox_is_a_no_op() {
        let transport = RecordingTransport::with_responses(vec![]);
        let mut session = Session::new(transport);
        session.release().await.unwrap();
        assert!(session.sandbox_name().is_none());
    }

    #[test]
    fn strip_sudo_removes_leading_prefix_only() {
        assert_eq!(strip_sudo("sudo rm -rf /data"), "rm -rf /data");
        assert_eq!(strip_sudo("echo sudo nope"), "echo sudo nope");
    }

    #[test]
    fn normalize_working_dir_maps_every_alias_to_root() {
        for alias in CWD_ALIASES {
            assert_eq!(normalize_working_dir(alias), "/");
        }
        assert_eq!(normalize_working_dir("/srv/data"), "/srv/data");
    }

    #[test]
    fn parse_tool_result_strips_success_framing() {
        let raw = ok_result("命令执行成功: all good");
        let parsed = parse_tool_result(raw);
        assert_eq!(parsed.stdout, "all good");
        assert!(!parsed.is_error);
    }

    #[test]
    fn parse_tool_result_overrides_is_error_on_keyword_match() {
        let raw = ok_result("脚本执行失败: permission denied");
        let parsed = parse_tool_result(raw);
        assert!(parsed.is_error);
    }
}
