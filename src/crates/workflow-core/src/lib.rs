//! Sequential graph execution engine shared by every workflow in
//! `workflows` (Analysis, Selection, Execution, Report).
//!
//! One node runs at a time; the next node is resolved from the state
//! the previous node just returned, via a direct or conditional edge.
//! There is no channel/reducer machinery and no parallel branching —
//! every workflow in this system is a single chain with occasional
//! loop-back edges for retries.

pub mod compiled;
pub mod graph;

pub use compiled::{Cancellable, CompiledGraph};
pub use graph::{Edge, Graph, GraphError, NodeFn, NodeId, Selector, END, START};
