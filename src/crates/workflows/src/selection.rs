//! Selection: pick a sample image per test case from the task's
//! dataset (§4.3). `list_labels`/`read_contents` loop until the
//! sandbox's output looks like actual annotation content rather than a
//! bare file listing, capped at 3 attempts.

use std::collections::HashMap;
use std::sync::Arc;

use llm_gateway::Gateway;
use persistence::{CaseRow, Store};
use sandbox::{ExecutorTransport, Session};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;
use workflow_core::{Graph, NodeFn, END, START};

use crate::dispatch::dispatch_strategy;
use crate::Cancellable;

/// Fallback filename for cases the LLM declines to map — the Python
/// source's literal default.
pub const DEFAULT_SAMPLE_FILENAME: &str = "000001.jpg";

const MAX_READ_ATTEMPTS: u32 = 3;
const CANDIDATE_LABEL_PATHS: &[&str] = &["labels", "Annotations", "*.xml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionState {
    pub task_id: String,
    pub dataset_location: String,
    pub label_data: Option<String>,
    pub label_content_ready: bool,
    pub label_files: Vec<String>,
    pub test_cases: Vec<CaseRow>,
    pub image_mapping: HashMap<String, String>,
    pub attempt_count: u32,
    pub errors: Vec<String>,
    pub status: String,
}

impl SelectionState {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            dataset_location: String::new(),
            label_data: None,
            label_content_ready: false,
            label_files: Vec::new(),
            test_cases: Vec::new(),
            image_mapping: HashMap::new(),
            attempt_count: 0,
            errors: Vec::new(),
            status: "running".to_string(),
        }
    }
}

impl Cancellable for SelectionState {
    fn mark_cancelled(&mut self) {
        self.status = "cancelled".to_string();
    }
}

pub fn build<T: ExecutorTransport + 'static>(
    gateway: Arc<Gateway>,
    store: Arc<Store>,
    session: Arc<Mutex<Session<T>>>,
) -> Graph<SelectionState> {
    let mut graph = Graph::new();

    graph.add_node("task_info", task_info_node(store.clone()));
    graph.add_node("list_labels", list_labels_node(gateway.clone(), session.clone()));
    graph.add_node("read_contents", read_contents_node(session));
    graph.add_node("get_cases", get_cases_node(store.clone()));
    graph.add_node("select_images", select_images_node(gateway));
    graph.add_node("update_store", update_store_node(store));
    graph.add_node("label_content_failed", label_content_failed_node());

    graph.add_edge(START, "task_info");
    graph.add_edge("task_info", "list_labels");
    graph.add_conditional_edge("list_labels", readiness_selector(), readiness_branches());
    graph.add_conditional_edge("read_contents", readiness_selector(), readiness_branches());
    graph.add_edge("get_cases", "select_images");
    graph.add_edge("select_images", "update_store");
    graph.add_edge("update_store", END);
    graph.add_edge("label_content_failed", END);

    graph
}

fn readiness_selector() -> workflow_core::Selector<SelectionState> {
    Arc::new(|state: &SelectionState| {
        if state.label_content_ready {
            "ready".to_string()
        } else if state.attempt_count < MAX_READ_ATTEMPTS {
            "retry".to_string()
        } else {
            "done".to_string()
        }
    })
}

fn readiness_branches() -> HashMap<String, String> {
    HashMap::from([
        ("ready".to_string(), "get_cases".to_string()),
        ("retry".to_string(), "read_contents".to_string()),
        ("done".to_string(), "label_content_failed".to_string()),
    ])
}

/// Terminal node for the 3-failed-attempts exhaustion path (P6):
/// distinguishes "gave up reading labels" from every other status.
fn label_content_failed_node() -> NodeFn<SelectionState> {
    Arc::new(|mut state: SelectionState| {
        Box::pin(async move {
            state.status = "label content failed".to_string();
            state
        })
    })
}

fn task_info_node(store: Arc<Store>) -> NodeFn<SelectionState> {
    Arc::new(move |mut state: SelectionState| {
        let store = store.clone();
        Box::pin(async move {
            match store.get_task(&state.task_id).await {
                Ok(task) => match task.dataset_location {
                    Some(location) => state.dataset_location = location,
                    None => {
                        state.status = "error".to_string();
                        state.errors.push("task has no dataset_location".to_string());
                    }
                },
                Err(err) => {
                    state.status = "error".to_string();
                    state.errors.push(format!("failed to load task: {err}"));
                }
            }
            state
        })
    })
}

fn list_labels_node<T: ExecutorTransport + 'static>(gateway: Arc<Gateway>, session: Arc<Mutex<Session<T>>>) -> NodeFn<SelectionState> {
    Arc::new(move |mut state: SelectionState| {
        let gateway = gateway.clone();
        let session = session.clone();
        Box::pin(async move {
            if state.status == "error" {
                return state;
            }

            let strategy = match gateway.list_labels_command(&state.dataset_location).await {
                Ok(strategy) => strategy,
                Err(err) => {
                    warn!(error = %err, "list_labels_command failed");
                    state.attempt_count += 1;
                    return state;
                }
            };

            let mut session = session.lock().await;
            match dispatch_strategy(&mut session, &strategy).await {
                Ok(result) => apply_label_output(&mut state, &result.stdout),
                Err(err) => {
                    warn!(error = %err, "list_labels dispatch failed");
                    state.attempt_count += 1;
                }
            }

            state
        })
    })
}

fn read_contents_node<T: ExecutorTransport + 'static>(session: Arc<Mutex<Session<T>>>) -> NodeFn<SelectionState> {
    Arc::new(move |mut state: SelectionState| {
        let session = session.clone();
        Box::pin(async move {
            let candidate = CANDIDATE_LABEL_PATHS[(state.attempt_count as usize) % CANDIDATE_LABEL_PATHS.len()];
            let command = format!(
                "find {}/{candidate} -maxdepth 2 -type f 2>/dev/null | head -50 | xargs -I{{}} sh -c 'echo ===\"{{}}\"===; cat \"{{}}\"' 2>/dev/null",
                state.dataset_location
            );

            let mut session = session.lock().await;
            match session.execute_command(&command, None).await {
                Ok(result) => apply_label_output(&mut state, &result.stdout),
                Err(err) => warn!(error = %err, "read_contents dispatch failed"),
            }
            drop(session);

            state.attempt_count += 1;
            state
        })
    })
}

/// XML/JSON annotation markers mean the sandbox actually handed back
/// file *contents*; their absence plus short filename-looking lines
/// means it only handed back a listing.
fn apply_label_output(state: &mut SelectionState, stdout: &str) {
    let looks_like_annotations = stdout.contains("<annotation") || stdout.trim_start().starts_with('{') || stdout.contains("\"bbox\"");

    state.label_data = Some(stdout.to_string());
    state.label_content_ready = looks_like_annotations;

    if !looks_like_annotations {
        state.label_files = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.len() < 256)
            .map(str::to_string)
            .collect();
    }
}

fn get_cases_node(store: Arc<Store>) -> NodeFn<SelectionState> {
    Arc::new(move |mut state: SelectionState| {
        let store = store.clone();
        Box::pin(async move {
            match store.list_cases(&state.task_id).await {
                Ok(cases) => state.test_cases = cases,
                Err(err) => {
                    state.status = "error".to_string();
                    state.errors.push(format!("failed to load cases: {err}"));
                }
            }
            state
        })
    })
}

fn select_images_node(gateway: Arc<Gateway>) -> NodeFn<SelectionState> {
    Arc::new(move |mut state: SelectionState| {
        let gateway = gateway.clone();
        Box::pin(async move {
            if state.status == "error" {
                return state;
            }

            let label_content = state.label_data.clone().unwrap_or_default();
            let label_summary = match gateway.analyze_labels(&label_content).await {
                Ok(summary) => summary,
                Err(err) => {
                    warn!(error = %err, "analyze_labels failed, using raw label content");
                    label_content.clone()
                }
            };

            let case_descriptions: Vec<(String, String)> = state
                .test_cases
                .iter()
                .map(|case| (case.case_id.clone(), format!("{}: {}", case.purpose, case.steps)))
                .collect();

            let mapping = match gateway.select_images(&label_summary, &case_descriptions).await {
                Ok(mapping) => mapping,
                Err(err) => {
                    warn!(error = %err, "select_images failed, falling back to defaults for every case");
                    HashMap::new()
                }
            };

            state.image_mapping = state
                .test_cases
                .iter()
                .map(|case| {
                    let filename = mapping
                        .get(&case.case_id)
                        .map(|name| normalize_filename(name))
                        .unwrap_or_else(|| DEFAULT_SAMPLE_FILENAME.to_string());
                    (case.case_id.clone(), filename)
                })
                .collect();

            state
        })
    })
}

fn normalize_filename(raw: &str) -> String {
    let basename = raw.rsplit('/').next().unwrap_or(raw);
    if basename.contains('.') {
        basename.to_string()
    } else {
        format!("{basename}.jpg")
    }
}

fn update_store_node(store: Arc<Store>) -> NodeFn<SelectionState> {
    Arc::new(move |mut state: SelectionState| {
        let store = store.clone();
        Box::pin(async move {
            for (case_id, filename) in &state.image_mapping {
                let test_data = format!("data/Images/{filename}");
                if let Err(err) = store.set_case_test_data(case_id, &test_data).await {
                    state.errors.push(format!("failed to update test_data for {case_id}: {err}"));
                }
            }
            if state.status != "error" {
                state.status = "updated".to_string();
            }
            state
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_filename_strips_path_and_adds_extension() {
        assert_eq!(normalize_filename("a/b/000005"), "000005.jpg");
        assert_eq!(normalize_filename("000005.png"), "000005.png");
    }

    #[test]
    fn apply_label_output_detects_xml_annotations() {
        let mut state = SelectionState::new("TASK1");
        apply_label_output(&mut state, "<annotation><object>dog</object></annotation>");
        assert!(state.label_content_ready);
    }

    #[test]
    fn apply_label_output_treats_bare_filenames_as_list_only() {
        let mut state = SelectionState::new("TASK1");
        apply_label_output(&mut state, "000001.jpg\n000002.jpg\n000003.jpg");
        assert!(!state.label_content_ready);
        assert_eq!(state.label_files.len(), 3);
    }

    #[test]
    fn readiness_selector_caps_at_three_attempts() {
        let selector = readiness_selector();
        let mut state = SelectionState::new("TASK1");
        state.attempt_count = 3;
        assert_eq!(selector(&state), "done");
        state.attempt_count = 2;
        assert_eq!(selector(&state), "retry");
        state.label_content_ready = true;
        assert_eq!(selector(&state), "ready");
    }

    #[tokio::test]
    async fn label_content_failed_node_sets_terminal_status() {
        let node = label_content_failed_node();
        let mut state = SelectionState::new("TASK1");
        state.attempt_count = MAX_READ_ATTEMPTS;
        state = node(state).await;
        assert_eq!(state.status, "label content failed");
    }
}
