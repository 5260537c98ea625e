//! `Gateway` — the single entry point every workflow calls through,
//! one method per recognized call site. Every public method funnels
//! into the private [`Gateway::complete`], which owns auth, retry, and
//! the HTTP round trip.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::auth::generate_jwt;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::extract::extract_json;
use crate::retry::{retry_with_escalating_timeout, AttemptOutcome};

const CHAT_COMPLETIONS_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// A single command the execution workflow can hand to the sandbox.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CommandStrategy {
    pub tool: String,
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Result of Report's authoritative pass/fail scoring.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisVerdict {
    pub is_passed: bool,
    pub analysis: String,
    #[serde(default)]
    pub conclusion: String,
}

pub struct Gateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Analysis's `synthesize_test_cases` node: embeds the extracted
    /// PDF text and demands the `测试用例N` header format.
    pub async fn synthesize_test_cases(&self, document_text: &str) -> Result<String> {
        let prompt = format!(
            "你是一名专业的测试工程师。请根据以下需求文档生成测试用例，\
             每条用例以“测试用例N”为标题，并包含目的、步骤、预期结果、验证方法字段。\n\n\
             需求文档内容:\n{document_text}"
        );
        self.complete("synthesize_test_cases", &prompt).await
    }

    /// Selection's `list_labels` node prompt — asks for a shell
    /// command to enumerate (and ideally read) annotation files.
    pub async fn list_labels_command(&self, dataset_location: &str) -> Result<CommandStrategy> {
        let prompt = format!(
            "请给出一条shell命令，用于列出并尽可能读取以下数据集目录中的标注文件内容:\n{dataset_location}\n\
             请返回JSON对象，包含 tool、parameters.command、description 字段。"
        );
        let raw = self.complete("list_labels", &prompt).await?;
        let value = extract_json(&raw)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Selection's `analyze_labels` node: summarizes/validates raw
    /// label file content the sandbox returned.
    pub async fn analyze_labels(&self, label_content: &str) -> Result<String> {
        let prompt = format!(
            "以下是从数据集中读取到的标注文件内容，请总结其结构和可用的图片文件名列表:\n{label_content}"
        );
        self.complete("analyze_labels", &prompt).await
    }

    /// Selection's `select_images` node: maps each test case to the
    /// best-matching sample image filename.
    pub async fn select_images(
        &self,
        label_summary: &str,
        case_descriptions: &[(String, String)],
    ) -> Result<HashMap<String, String>> {
        let cases_block = case_descriptions
            .iter()
            .map(|(id, desc)| format!("- {id}: {desc}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "标注摘要:\n{label_summary}\n\n测试用例列表:\n{cases_block}\n\n\
             请为每个测试用例选择一张最匹配的样本图片文件名，返回JSON对象，\
             键为测试用例ID，值为图片文件名。"
        );
        let raw = self.complete("select_images", &prompt).await?;
        let value = extract_json(&raw)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Execution's `parse_command` node — the docker-exec exemplar is
    /// recovered verbatim from `original_source/agents/execution_agent.py`
    /// as the library-specific command-format reference the model is
    /// shown.
    pub async fn parse_step_to_command(
        &self,
        step: &str,
        container_name: &str,
        test_data_path: &str,
    ) -> Result<CommandStrategy> {
        let prompt = format!(
            "请将以下测试用例步骤转换为JSON格式的执行策略，只返回一条最关键的命令。\n\n\
             可用工具: execute_command(command, working_dir?), execute_script(script, working_dir?), \
             list_directory(directory, recursive?), read_file(file_path)。\n\n\
             示例命令格式: docker exec {container_name} ./ev_sdk/bin/test-ji-api -f 1 -i /data/000000.jpg -o ./output.jpg -a '{{\"draw_confidence\": true}}'\n\n\
             测试步骤:\n{step}\n\n测试数据路径: {test_data_path}\n容器名称: {container_name}\n\n\
             请返回JSON对象，包含 tool、parameters、description 字段。"
        );
        let raw = self.complete("parse_step_to_command", &prompt).await?;
        let mut value = extract_json(&raw)?;
        // The model sometimes answers with a one-element array instead
        // of the requested single object.
        if let serde_json::Value::Array(ref mut items) = value {
            if !items.is_empty() {
                value = items.remove(0);
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Report's `analyze` node: the authoritative pass/fail scoring
    /// that, once run, always overwrites Execution's synthetic flag.
    pub async fn analyze_results(
        &self,
        expected_result: &str,
        validation_method: &str,
        actual_output: &str,
    ) -> Result<AnalysisVerdict> {
        let prompt = format!(
            "预期结果:\n{expected_result}\n\n验证方法:\n{validation_method}\n\n实际输出:\n{actual_output}\n\n\
             请判断该测试用例是否通过，返回JSON对象，包含 is_passed（布尔值）、analysis（分析说明）和 conclusion（结论）字段。"
        );
        let raw = self.complete("analyze_results", &prompt).await?;
        let value = extract_json(&raw)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Report's `emit_spreadsheet` node: a human-readable case row
    /// summary for the report table.
    pub async fn synthesize_report_row(
        &self,
        name: &str,
        is_passed: bool,
        analysis: &str,
    ) -> Result<String> {
        let prompt = format!(
            "测试用例: {name}\n通过情况: {}\n分析: {analysis}\n\n请生成一句简洁的中文报告结论。",
            if is_passed { "通过" } else { "未通过" }
        );
        self.complete("synthesize_report_row", &prompt).await
    }

    async fn complete(&self, call_site: &str, prompt: &str) -> Result<String> {
        let (api_id, api_secret) = self.config.split_api_key().ok_or(GatewayError::InvalidApiKey)?;

        let result = retry_with_escalating_timeout(&self.config, call_site, |timeout| {
            self.attempt(api_id, api_secret, prompt, timeout)
        })
        .await;

        match result {
            Ok(content) => Ok(content),
            Err(_) => {
                warn!(call_site, "LLM call exhausted all retries");
                Err(GatewayError::Exhausted(self.config.retry_count))
            }
        }
    }

    async fn attempt(
        &self,
        api_id: &str,
        api_secret: &str,
        prompt: &str,
        timeout: std::time::Duration,
    ) -> std::result::Result<String, AttemptOutcome> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let token = generate_jwt(api_id, api_secret, now, 3600);

        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        let body = json!({
            "model": self.config.model,
            "messages": [Message { role: "user", content: prompt }],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(token)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { AttemptOutcome::TimedOut } else { AttemptOutcome::OtherError })?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|_| AttemptOutcome::OtherError)?;

        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(AttemptOutcome::OtherError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_api_key_rejects_malformed_key() {
        let config = GatewayConfig {
            api_key: "no-dot-here".to_string(),
            ..GatewayConfig::default()
        };
        assert!(config.split_api_key().is_none());
    }

    #[test]
    fn split_api_key_accepts_composite_key() {
        let config = GatewayConfig {
            api_key: "abc123.secretvalue".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(config.split_api_key(), Some(("abc123", "secretvalue")));
    }
}
