//! Compilation and execution of a validated [`Graph`].

use tracing::{debug, instrument, warn};

use crate::graph::{Edge, Graph, GraphError, NodeId, END};

/// A state type that can record its own cancellation. Every concrete
/// `WorkflowState` in this workspace carries a `status: String` field
/// by convention (§4.1's "common frame"); this trait is the one hook
/// `run_cancellable` needs into it.
pub trait Cancellable {
    /// Mark the state as cancelled in place.
    fn mark_cancelled(&mut self);
}

/// A graph that has passed [`Graph::validate`] and is ready to run.
pub struct CompiledGraph<S> {
    graph: Graph<S>,
}

impl<S> CompiledGraph<S> {
    pub fn compile(graph: Graph<S>) -> Result<Self, GraphError> {
        graph.validate()?;
        Ok(Self { graph })
    }

    /// Run from `entry` to `END`, or until a node has no outgoing edge.
    /// Each node consumes and returns the state by value — only one
    /// node ever executes at a time (P1 determinism).
    #[instrument(skip_all)]
    pub async fn run(&self, initial: S) -> S {
        let mut state = initial;
        let mut current: NodeId = self.graph.entry().clone();

        loop {
            if current == END {
                debug!("workflow reached END");
                return state;
            }

            let Some(node) = self.graph.node(&current) else {
                debug!(node = %current, "node has no executor registered, stopping");
                return state;
            };

            state = node(state).await;

            current = match self.graph.edge(&current.clone()) {
                Some(Edge::Direct(target)) => target.clone(),
                Some(Edge::Conditional { selector, branches }) => {
                    let key = selector(&state);
                    match branches.get(&key) {
                        Some(target) => target.clone(),
                        None => {
                            warn!(branch = %key, node = %current, "conditional edge selected an unregistered branch");
                            return state;
                        }
                    }
                }
                None => {
                    debug!(node = %current, "no outgoing edge, stopping");
                    return state;
                }
            };
        }
    }
}

impl<S: Cancellable + Send> CompiledGraph<S> {
    /// Same as [`Self::run`], but checks `token` before invoking each
    /// node. On cancellation, returns the last state reached with
    /// [`Cancellable::mark_cancelled`] applied — everything else about
    /// the state is left untouched (§5 Cancellation).
    #[instrument(skip_all)]
    pub async fn run_cancellable(&self, initial: S, token: tokio_util::sync::CancellationToken) -> S {
        let mut state = initial;
        let mut current: NodeId = self.graph.entry().clone();

        loop {
            if token.is_cancelled() {
                debug!("cancellation observed before node execution");
                state.mark_cancelled();
                return state;
            }

            if current == END {
                return state;
            }

            let Some(node) = self.graph.node(&current) else {
                return state;
            };

            state = node(state).await;

            current = match self.graph.edge(&current.clone()) {
                Some(Edge::Direct(target)) => target.clone(),
                Some(Edge::Conditional { selector, branches }) => {
                    let key = selector(&state);
                    match branches.get(&key) {
                        Some(target) => target.clone(),
                        None => return state,
                    }
                }
                None => return state,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{END, START};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Counter {
        value: i32,
        status: String,
    }

    impl Cancellable for Counter {
        fn mark_cancelled(&mut self) {
            self.status = "cancelled".to_string();
        }
    }

    #[tokio::test]
    async fn runs_linear_chain_to_end() {
        let mut graph: Graph<Counter> = Graph::new();
        graph.add_node(
            "increment",
            Arc::new(|mut s: Counter| {
                Box::pin(async move {
                    s.value += 1;
                    s
                })
            }),
        );
        graph.add_edge(START, "increment");
        graph.add_edge("increment", END);

        let compiled = CompiledGraph::compile(graph).unwrap();
        let result = compiled
            .run(Counter {
                value: 0,
                status: "running".to_string(),
            })
            .await;
        assert_eq!(result.value, 1);
    }

    #[tokio::test]
    async fn conditional_edge_loops_until_threshold() {
        let mut graph: Graph<Counter> = Graph::new();
        graph.add_node(
            "increment",
            Arc::new(|mut s: Counter| {
                Box::pin(async move {
                    s.value += 1;
                    s
                })
            }),
        );
        graph.add_edge(START, "increment");
        graph.add_conditional_edge(
            "increment",
            Arc::new(|s: &Counter| if s.value < 3 { "loop".to_string() } else { "done".to_string() }),
            HashMap::from([
                ("loop".to_string(), "increment".to_string()),
                ("done".to_string(), END.to_string()),
            ]),
        );

        let compiled = CompiledGraph::compile(graph).unwrap();
        let result = compiled
            .run(Counter {
                value: 0,
                status: "running".to_string(),
            })
            .await;
        assert_eq!(result.value, 3);
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_node() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();

        let calls_clone = calls.clone();
        let mut graph: Graph<Counter> = Graph::new();
        graph.add_node(
            "increment",
            Arc::new(move |mut s: Counter| {
                let calls = calls_clone.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    s.value += 1;
                    s
                })
            }),
        );
        graph.add_edge(START, "increment");
        graph.add_edge("increment", END);

        let compiled = CompiledGraph::compile(graph).unwrap();
        let result = compiled
            .run_cancellable(
                Counter {
                    value: 0,
                    status: "running".to_string(),
                },
                token,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.status, "cancelled");
    }
}
