//! Report: per-case LLM scoring, then an `.xlsx` writeup (§4.5).
//! `analyze`'s verdict is authoritative — it always overwrites the
//! synthetic pass/fail flag Execution recorded.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{now_utc, time::stamp_for_filename, CaseStatus, Verdict};
use llm_gateway::Gateway;
use persistence::{CaseRow, Store};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use tracing::warn;
use workflow_core::{Graph, NodeFn, END, START};

use crate::error::WorkflowError;
use crate::Cancellable;

const SECTION_HEADERS: &[&str] = &["精度测试结果", "模型识别率测试分析", "性能测试分析", "兼容性测试分析", "规范测试分析"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportState {
    pub task_id: String,
    pub test_requirement: String,
    /// Basic-info placeholders the original hardcoded empty; promoted
    /// to explicit optional inputs so the HTTP façade can supply them
    /// at trigger time without losing the "absent" case.
    pub sdk_version: Option<String>,
    pub algorithm_image: String,
    pub dataset_location: String,
    pub operator: Option<String>,
    pub test_cases: Option<Vec<CaseRow>>,
    pub report_path: Option<String>,
    pub errors: Vec<String>,
    pub status: String,
}

impl ReportState {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            test_requirement: String::new(),
            sdk_version: None,
            algorithm_image: String::new(),
            dataset_location: String::new(),
            operator: None,
            test_cases: None,
            report_path: None,
            errors: Vec::new(),
            status: "running".to_string(),
        }
    }
}

impl Cancellable for ReportState {
    fn mark_cancelled(&mut self) {
        self.status = "cancelled".to_string();
    }
}

pub fn build(gateway: Arc<Gateway>, store: Arc<Store>) -> Graph<ReportState> {
    let mut graph = Graph::new();

    graph.add_node("analyze", analyze_node(gateway.clone(), store.clone()));
    graph.add_node("emit_spreadsheet", emit_spreadsheet_node(gateway, store));

    graph.add_edge(START, "analyze");
    graph.add_edge("analyze", "emit_spreadsheet");
    graph.add_edge("emit_spreadsheet", END);

    graph
}

/// Requests a verdict per case. Cases the LLM has nothing to say about
/// are recorded with an error marker, never failed outright.
fn analyze_node(gateway: Arc<Gateway>, store: Arc<Store>) -> NodeFn<ReportState> {
    Arc::new(move |mut state: ReportState| {
        let gateway = gateway.clone();
        let store = store.clone();
        Box::pin(async move {
            let cases = match store.list_cases(&state.task_id).await {
                Ok(cases) => cases,
                Err(err) => {
                    state.status = "error".to_string();
                    state.errors.push(format!("failed to load cases: {err}"));
                    return state;
                }
            };

            for case in &cases {
                let actual_output = case.actual_output.clone().unwrap_or_default();
                match gateway
                    .analyze_results(&case.expected_result, &case.validation_method, &actual_output)
                    .await
                {
                    Ok(verdict) => {
                        let result_analysis = format!("{}\n\n{}", verdict.analysis, verdict.conclusion);
                        if let Err(err) = store
                            .save_case_result(&case.case_id, &actual_output, &result_analysis, Verdict::from_bool(verdict.is_passed), CaseStatus::Completed)
                            .await
                        {
                            state.errors.push(format!("failed to save analysis for {}: {err}", case.case_id));
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, case_id = %case.case_id, "analyze_results failed");
                        state.errors.push(format!("no analysis for case {}", case.case_id));
                    }
                }
            }

            match store.list_cases(&state.task_id).await {
                Ok(refreshed) => state.test_cases = Some(refreshed),
                Err(err) => state.errors.push(format!("failed to reload cases: {err}")),
            }

            state
        })
    })
}

fn emit_spreadsheet_node(gateway: Arc<Gateway>, store: Arc<Store>) -> NodeFn<ReportState> {
    Arc::new(move |mut state: ReportState| {
        let gateway = gateway.clone();
        let store = store.clone();
        Box::pin(async move {
            let cases = match &state.test_cases {
                Some(cases) => cases.clone(),
                None => match store.list_cases(&state.task_id).await {
                    Ok(cases) => cases,
                    Err(err) => {
                        state.status = "error".to_string();
                        state.errors.push(format!("failed to load cases: {err}"));
                        return state;
                    }
                },
            };

            let mut rows = Vec::with_capacity(cases.len());
            for case in &cases {
                let is_passed = Verdict::parse(&case.is_passed).as_bool().unwrap_or(false);
                let note = gateway
                    .synthesize_report_row(&case.name, is_passed, case.result_analysis.as_deref().unwrap_or(""))
                    .await
                    .unwrap_or_else(|err| {
                        warn!(error = %err, case_id = %case.case_id, "synthesize_report_row failed");
                        String::new()
                    });
                rows.push(ReportRow {
                    name: case.name.clone(),
                    result: if is_passed { "通过" } else { "不通过" },
                    analysis: case.result_analysis.clone().unwrap_or_default(),
                    note,
                });
            }

            match write_workbook(&state, &rows) {
                Ok(path) => {
                    let (passed, failed) = case_counts(&cases);
                    let summary = format!("{} passed, {} failed", passed, failed);
                    if let Err(err) = store
                        .save_report(&state.task_id, &summary, cases.len() as i64, passed as i64, failed as i64, &path)
                        .await
                    {
                        state.errors.push(format!("failed to save report row: {err}"));
                    }
                    state.report_path = Some(path);
                    state.status = "completed".to_string();
                }
                Err(err) => {
                    state.status = "error".to_string();
                    state.errors.push(err.to_string());
                }
            }

            state
        })
    })
}

struct ReportRow {
    name: String,
    result: &'static str,
    analysis: String,
    note: String,
}

fn write_workbook(state: &ReportState, rows: &[ReportRow]) -> Result<String, WorkflowError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let mut row_idx = 0u32;
    sheet.write_string(row_idx, 0, "测试需求").map_err(xlsx_err)?;
    sheet.write_string(row_idx, 1, &state.test_requirement).map_err(xlsx_err)?;
    row_idx += 1;
    sheet.write_string(row_idx, 0, "SDK版本").map_err(xlsx_err)?;
    sheet.write_string(row_idx, 1, state.sdk_version.as_deref().unwrap_or("")).map_err(xlsx_err)?;
    row_idx += 1;
    sheet.write_string(row_idx, 0, "算法镜像").map_err(xlsx_err)?;
    sheet.write_string(row_idx, 1, &state.algorithm_image).map_err(xlsx_err)?;
    row_idx += 1;
    sheet.write_string(row_idx, 0, "数据集").map_err(xlsx_err)?;
    sheet.write_string(row_idx, 1, &state.dataset_location).map_err(xlsx_err)?;
    row_idx += 1;
    sheet.write_string(row_idx, 0, "测试人员").map_err(xlsx_err)?;
    sheet.write_string(row_idx, 1, state.operator.as_deref().unwrap_or("")).map_err(xlsx_err)?;
    row_idx += 2;

    for header in SECTION_HEADERS {
        sheet.write_string(row_idx, 0, *header).map_err(xlsx_err)?;
        row_idx += 1;
    }
    row_idx += 1;

    let columns = ["序号", "用例名称", "测试结果", "结果分析", "备注"];
    for (col, title) in columns.iter().enumerate() {
        sheet.write_string(row_idx, col as u16, *title).map_err(xlsx_err)?;
    }
    row_idx += 1;

    for (i, row) in rows.iter().enumerate() {
        sheet.write_number(row_idx, 0, (i + 1) as f64).map_err(xlsx_err)?;
        sheet.write_string(row_idx, 1, &row.name).map_err(xlsx_err)?;
        sheet.write_string(row_idx, 2, row.result).map_err(xlsx_err)?;
        sheet.write_string(row_idx, 3, &row.analysis).map_err(xlsx_err)?;
        sheet.write_string(row_idx, 4, &row.note).map_err(xlsx_err)?;
        row_idx += 1;
    }

    let filename = format!("test_report_{}_{}.xlsx", state.task_id, stamp_for_filename(now_utc()));
    let path = format!("data/report/{filename}");
    if let Some(parent) = std::path::Path::new(&path).parent() {
        std::fs::create_dir_all(parent).map_err(|e| WorkflowError::Spreadsheet(e.to_string()))?;
    }
    workbook.save(&path).map_err(xlsx_err)?;

    Ok(path)
}

fn xlsx_err(err: rust_xlsxwriter::XlsxError) -> WorkflowError {
    WorkflowError::Spreadsheet(err.to_string())
}

fn case_counts(cases: &[CaseRow]) -> (usize, usize) {
    let passed = cases.iter().filter(|c| Verdict::parse(&c.is_passed) == Verdict::Pass).count();
    (passed, cases.len() - passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_counts_splits_pass_and_fail() {
        let cases = vec![];
        let (passed, failed) = case_counts(&cases);
        assert_eq!(passed, 0);
        assert_eq!(failed, 0);
    }

    #[test]
    fn section_headers_match_the_five_named_sections() {
        assert_eq!(SECTION_HEADERS.len(), 5);
        assert!(SECTION_HEADERS.contains(&"精度测试结果"));
    }
}
