//! Graph data structures: nodes, edges, and the entry point.
//!
//! Generalized down from `langgraph-core::graph` for this system's
//! actual shape — one node runs at a time, routing is decided from the
//! state a node just returned, and there is no channel/Pregel machinery
//! because no workflow here needs parallel branches or map-reduce.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Node identifier, unique within a [`Graph`].
pub type NodeId = String;

/// Virtual entry node. Never executed; only used as an edge source.
pub const START: &str = "__start__";

/// Virtual terminal node. A node with an edge to `END` (or no outgoing
/// edge at all) stops the run.
pub const END: &str = "__end__";

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A node's executor. Nodes never return `Result` — failure is encoded
/// into the state itself (`errors`/`status` fields, by convention of
/// every `WorkflowState` in this workspace), so the engine has nothing
/// to propagate.
pub type NodeFn<S> = Arc<dyn Fn(S) -> BoxFuture<S> + Send + Sync>;

/// Router function for a [`Edge::Conditional`]. Reads the state a node
/// just produced and returns a branch key looked up in `branches`.
pub type Selector<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// An outgoing transition from a node.
#[derive(Clone)]
pub enum Edge<S> {
    /// Always continue to this node.
    Direct(NodeId),
    /// Ask the selector which branch to take based on the state just
    /// produced, then look up the target in `branches`.
    Conditional {
        selector: Selector<S>,
        branches: HashMap<String, NodeId>,
    },
}

impl<S> fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct(id) => f.debug_tuple("Direct").field(id).finish(),
            Edge::Conditional { branches, .. } => {
                f.debug_struct("Conditional").field("branches", branches).finish()
            }
        }
    }
}

/// Errors detected while validating a [`Graph`] before it can be
/// compiled and run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("entry point {0:?} has no registered node")]
    MissingEntry(NodeId),
    #[error("edge from {0:?} references unknown node {1:?}")]
    UnknownTarget(NodeId, NodeId),
    #[error("node {0:?} has no outgoing edge and is not END")]
    DeadEnd(NodeId),
}

/// The graph itself: a node map, an edge map (at most one outgoing
/// edge per node — this system never needs fan-out), and an entry
/// point.
pub struct Graph<S> {
    nodes: HashMap<NodeId, NodeFn<S>>,
    edges: HashMap<NodeId, Edge<S>>,
    entry: NodeId,
}

impl<S> Graph<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: START.to_string(),
        }
    }

    pub fn add_node(&mut self, name: impl Into<NodeId>, executor: NodeFn<S>) -> &mut Self {
        self.nodes.insert(name.into(), executor);
        self
    }

    /// `START -> name` when `from == START`, otherwise an ordinary
    /// unconditional edge.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            self.entry = to.clone();
        }
        self.edges.insert(from, Edge::Direct(to));
        self
    }

    pub fn add_conditional_edge(
        &mut self,
        from: impl Into<NodeId>,
        selector: Selector<S>,
        branches: HashMap<String, NodeId>,
    ) -> &mut Self {
        self.edges.insert(from.into(), Edge::Conditional { selector, branches });
        self
    }

    pub fn set_entry(&mut self, name: impl Into<NodeId>) -> &mut Self {
        self.entry = name.into();
        self
    }

    /// Checks the entry node exists and every edge's targets exist (or
    /// are `END`). Every node reachable from `entry` must resolve to a
    /// real node or `END` when it runs.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.entry != END && !self.nodes.contains_key(&self.entry) {
            return Err(GraphError::MissingEntry(self.entry.clone()));
        }

        for (source, edge) in &self.edges {
            let targets: Vec<&NodeId> = match edge {
                Edge::Direct(target) => vec![target],
                Edge::Conditional { branches, .. } => branches.values().collect(),
            };
            for target in targets {
                if target != END && !self.nodes.contains_key(target) {
                    return Err(GraphError::UnknownTarget(source.clone(), target.clone()));
                }
            }
        }

        for name in self.nodes.keys() {
            if name != &self.entry && !self.edges.contains_key(name) {
                return Err(GraphError::DeadEnd(name.clone()));
            }
        }

        Ok(())
    }

    pub(crate) fn entry(&self) -> &NodeId {
        &self.entry
    }

    pub(crate) fn node(&self, id: &str) -> Option<&NodeFn<S>> {
        self.nodes.get(id)
    }

    pub(crate) fn edge(&self, id: &str) -> Option<&Edge<S>> {
        self.edges.get(id)
    }
}

impl<S> Default for Graph<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_node() -> NodeFn<i32> {
        Arc::new(|s| Box::pin(async move { s }))
    }

    #[test]
    fn validates_linear_graph() {
        let mut graph: Graph<i32> = Graph::new();
        graph.add_node("step1", noop_node());
        graph.add_edge(START, "step1");
        graph.add_edge("step1", END);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn rejects_missing_entry() {
        let graph: Graph<i32> = Graph::new();
        assert_eq!(graph.validate(), Err(GraphError::MissingEntry(START.to_string())));
    }

    #[test]
    fn rejects_edge_to_unknown_node() {
        let mut graph: Graph<i32> = Graph::new();
        graph.add_node("step1", noop_node());
        graph.add_edge(START, "step1");
        graph.add_edge("step1", "ghost");
        assert!(matches!(graph.validate(), Err(GraphError::UnknownTarget(_, _))));
    }

    #[test]
    fn rejects_node_with_no_outgoing_edge() {
        let mut graph: Graph<i32> = Graph::new();
        graph.add_node("step1", noop_node());
        graph.add_node("orphan", noop_node());
        graph.add_edge(START, "step1");
        graph.add_edge("step1", END);
        assert!(matches!(graph.validate(), Err(GraphError::DeadEnd(_))));
    }
}
