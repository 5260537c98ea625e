//! Analysis: document → extracted text → synthesized test cases →
//! persisted rows. Three nodes, one unconditional edge from each to
//! the next (§4.2).

use std::path::Path;
use std::sync::Arc;

use domain::CaseId;
use llm_gateway::Gateway;
use persistence::{NewCase, Store};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use workflow_core::{Graph, NodeFn, END, START};

use crate::Cancellable;

/// A case as synthesized by the LLM, before it has been through
/// Selection or Execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseDraft {
    pub case_id: String,
    pub name: String,
    pub purpose: String,
    pub steps: String,
    pub expected_result: String,
    pub validation_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisState {
    pub task_id: String,
    pub document_path: String,
    pub requirement_text: String,
    pub algorithm_image: String,
    pub pdf_content: Option<String>,
    pub test_cases: Option<Vec<TestCaseDraft>>,
    pub errors: Vec<String>,
    pub status: String,
}

impl AnalysisState {
    pub fn new(task_id: impl Into<String>, document_path: impl Into<String>, requirement_text: impl Into<String>, algorithm_image: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            document_path: document_path.into(),
            requirement_text: requirement_text.into(),
            algorithm_image: algorithm_image.into(),
            pdf_content: None,
            test_cases: None,
            errors: Vec::new(),
            status: "running".to_string(),
        }
    }
}

impl Cancellable for AnalysisState {
    fn mark_cancelled(&mut self) {
        self.status = "cancelled".to_string();
    }
}

/// Builds the three-node Analysis graph. `gateway` and `store` are
/// shared across every workflow run; each `run` call owns its own
/// state.
pub fn build(gateway: Arc<Gateway>, store: Arc<Store>) -> Graph<AnalysisState> {
    let mut graph = Graph::new();

    graph.add_node("extract_document_text", extract_document_text_node());
    graph.add_node("synthesize_test_cases", synthesize_test_cases_node(gateway));
    graph.add_node("persist_cases", persist_cases_node(store));

    graph.add_edge(START, "extract_document_text");
    graph.add_edge("extract_document_text", "synthesize_test_cases");
    graph.add_edge("synthesize_test_cases", "persist_cases");
    graph.add_edge("persist_cases", END);

    graph
}

fn extract_document_text_node() -> NodeFn<AnalysisState> {
    Arc::new(|mut state: AnalysisState| {
        Box::pin(async move {
            match extract_document_text(&state.document_path).await {
                Some(text) => state.pdf_content = Some(text),
                None => {
                    state.status = "error".to_string();
                    state.errors.push("unable to extract content".to_string());
                }
            }
            state
        })
    })
}

/// Tries, in order: `pdf-extract`'s native parser, `lopdf`'s
/// page-content-stream walk, then shelling out to `pdftotext`. First
/// non-empty result wins.
async fn extract_document_text(document_path: &str) -> Option<String> {
    let path = document_path.to_string();

    let native = tokio::task::spawn_blocking({
        let path = path.clone();
        move || pdf_extract::extract_text(&path).ok()
    })
    .await
    .ok()
    .flatten()
    .filter(|text| !text.trim().is_empty());
    if let Some(text) = native {
        return Some(text);
    }

    let via_lopdf = tokio::task::spawn_blocking({
        let path = path.clone();
        move || extract_via_lopdf(&path)
    })
    .await
    .ok()
    .flatten()
    .filter(|text| !text.trim().is_empty());
    if let Some(text) = via_lopdf {
        return Some(text);
    }

    extract_via_pdftotext(&path).await.filter(|text| !text.trim().is_empty())
}

fn extract_via_lopdf(path: &str) -> Option<String> {
    let doc = lopdf::Document::load(Path::new(path)).ok()?;
    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }
    Some(text)
}

async fn extract_via_pdftotext(path: &str) -> Option<String> {
    let output = tokio::process::Command::new("pdftotext")
        .arg(path)
        .arg("-")
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

fn synthesize_test_cases_node(gateway: Arc<Gateway>) -> NodeFn<AnalysisState> {
    Arc::new(move |mut state: AnalysisState| {
        let gateway = gateway.clone();
        Box::pin(async move {
            if state.status == "error" {
                return state;
            }
            let document_text = state.pdf_content.clone().unwrap_or_default();
            match gateway.synthesize_test_cases(&document_text).await {
                Ok(raw) => {
                    let cases = parse_test_cases(&raw);
                    state.test_cases = Some(cases);
                }
                Err(err) => {
                    warn!(error = %err, "synthesize_test_cases failed, continuing with no cases");
                    state.test_cases = Some(Vec::new());
                }
            }
            state
        })
    })
}

fn persist_cases_node(store: Arc<Store>) -> NodeFn<AnalysisState> {
    Arc::new(move |mut state: AnalysisState| {
        let store = store.clone();
        Box::pin(async move {
            if state.status == "error" {
                return state;
            }

            let drafts = state.test_cases.clone().unwrap_or_default();
            let new_cases: Vec<(String, NewCase)> = drafts
                .iter()
                .map(|draft| {
                    (
                        draft.case_id.clone(),
                        NewCase {
                            task_id: state.task_id.clone(),
                            document_id: None,
                            name: draft.name.clone(),
                            purpose: draft.purpose.clone(),
                            steps: draft.steps.clone(),
                            expected_result: draft.expected_result.clone(),
                            validation_method: draft.validation_method.clone(),
                        },
                    )
                })
                .collect();

            match store
                .save_analysis(&state.task_id, &state.requirement_text, &state.algorithm_image, &new_cases)
                .await
            {
                Ok(_) => state.status = "saved".to_string(),
                Err(err) => {
                    state.status = "error".to_string();
                    state.errors.push(format!("persist failed: {err}"));
                }
            }

            state
        })
    })
}

const HEADER_FIELDS: &[(&str, &str)] = &[
    ("目的", "purpose"),
    ("步骤", "steps"),
    ("预期结果", "expected_result"),
    ("验证方法", "validation_method"),
];

/// Splits the LLM's Markdown answer on "测试用例N" headers and parses
/// each block's labelled fields. Falls back to a line-oriented scan
/// when no headers matched at all. An empty parse is not an error —
/// it just means zero cases this round.
fn parse_test_cases(raw: &str) -> Vec<TestCaseDraft> {
    let header = Regex::new(r"测试用例\s*\d+[：:]?").unwrap();
    let matches: Vec<_> = header.find_iter(raw).collect();

    if matches.is_empty() {
        return parse_line_oriented(raw);
    }

    let mut cases = Vec::with_capacity(matches.len());
    for (i, m) in matches.iter().enumerate() {
        let block_start = m.end();
        let block_end = matches.get(i + 1).map(|next| next.start()).unwrap_or(raw.len());
        let block = &raw[block_start..block_end];
        cases.push(parse_fields_block(block));
    }
    cases
}

/// Used when the response has no "测试用例N" headers at all — each
/// "目的" line is treated as the start of a new case.
fn parse_line_oriented(raw: &str) -> Vec<TestCaseDraft> {
    let mut cases = Vec::new();
    let mut current_block = String::new();

    for line in raw.lines() {
        if line.trim_start().starts_with("目的") && current_block.contains("目的") {
            cases.push(parse_fields_block(&current_block));
            current_block.clear();
        }
        current_block.push_str(line);
        current_block.push('\n');
    }
    if current_block.contains("目的") {
        cases.push(parse_fields_block(&current_block));
    }
    cases
}

fn parse_fields_block(block: &str) -> TestCaseDraft {
    let mut name = String::new();
    let mut fields = std::collections::HashMap::new();
    let mut current_field: Option<&str> = None;

    for (idx, line) in block.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if idx == 0 && !HEADER_FIELDS.iter().any(|(label, _)| trimmed.starts_with(label)) {
            name = trimmed.trim_start_matches([':', '：']).trim().to_string();
            continue;
        }

        let matched_field = HEADER_FIELDS.iter().find(|(label, _)| trimmed.starts_with(label));
        if let Some((label, key)) = matched_field {
            let rest = trimmed[label.len()..].trim_start_matches([':', '：']).trim();
            fields.entry(*key).or_insert_with(String::new).push_str(rest);
            current_field = Some(key);
        } else if let Some(key) = current_field {
            let entry = fields.entry(key).or_insert_with(String::new);
            if !entry.is_empty() {
                entry.push('\n');
            }
            entry.push_str(trimmed);
        }
    }

    TestCaseDraft {
        case_id: CaseId::new().as_str().to_string(),
        name: if name.is_empty() { "未命名用例".to_string() } else { name },
        purpose: fields.remove("purpose").unwrap_or_default(),
        steps: fields.remove("steps").unwrap_or_default(),
        expected_result: fields.remove("expected_result").unwrap_or_default(),
        validation_method: fields.remove("validation_method").unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cases_split_on_headers() {
        let raw = "测试用例1：基础场景\n目的：验证基本功能\n步骤：执行一次调用\n预期结果：返回成功\n验证方法：检查状态码\n\n\
                    测试用例2：异常场景\n目的：验证异常处理\n步骤：传入非法参数\n预期结果：返回错误\n验证方法：检查错误信息";
        let cases = parse_test_cases(raw);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "基础场景");
        assert_eq!(cases[0].purpose, "验证基本功能");
        assert_eq!(cases[1].expected_result, "返回错误");
        assert!(cases[0].case_id.starts_with("TC"));
    }

    #[test]
    fn falls_back_to_line_oriented_parsing_with_no_headers() {
        let raw = "目的：验证基本功能\n步骤：执行一次调用\n预期结果：返回成功\n验证方法：检查状态码";
        let cases = parse_test_cases(raw);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].purpose, "验证基本功能");
    }

    #[test]
    fn empty_response_parses_to_an_empty_list_not_an_error() {
        assert!(parse_test_cases("").is_empty());
        assert!(parse_test_cases("no structured content here").is_empty());
    }

    #[test]
    fn multi_line_steps_are_joined() {
        let raw = "测试用例1：场景\n目的：验证\n步骤：第一步\n第二步\n预期结果：成功\n验证方法：人工检查";
        let cases = parse_test_cases(raw);
        assert_eq!(cases[0].steps, "第一步\n第二步");
    }
}
