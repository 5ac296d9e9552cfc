//! # appweaver-graph
//!
//! Graph execution and workflow orchestration engine for appweaver.
//!
//! A workflow is a directed graph of named nodes. Each node reads the
//! current state and returns a *patch*; the engine merges the patch and a
//! router (or unconditional edge) picks the successor, until a terminal
//! node edges to [`END`]. Runs are strictly sequential and deterministic
//! given the same collaborator responses.
//!
//! ## Core Concepts
//!
//! - **[`WorkflowState`] / [`StatePatch`]**: mergeable state with
//!   field-level disciplines ([`Update`] overwrite-latest, [`LogUpdate`]
//!   accumulate) and an explicit `Reset` instruction per field.
//! - **[`Node`]**: one unit of work, `run(&state) -> patch`.
//! - **[`Router`]**: pure state→label function with a declared vocabulary,
//!   checked against its wired targets at build time.
//! - **[`GraphBuilder`] / [`CompiledGraph`]**: strict wiring validation,
//!   then `invoke(seed, config) -> RunReport`.
//! - **[`Checkpointer`]**: thread-keyed persistence for multi-turn runs.
//!
//! ## Example
//!
//! ```ignore
//! use appweaver_graph::{GraphBuilder, FunctionNode, Router, RunConfig, END};
//!
//! let graph = GraphBuilder::new("pipeline")
//!     .node("work", FunctionNode::new("work", work_fn))
//!     .node("finish", FunctionNode::new("finish", finish_fn))
//!     .entry("work")
//!     .conditional("work", router, &[("again", "work"), ("done", "finish")])
//!     .edge("finish", END)
//!     .build()?;
//!
//! let report = graph.invoke(seed_patch, RunConfig::for_thread("session-1")).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod edge;
pub mod error;
pub mod executor;
pub mod graph;
pub mod node;
pub mod persistence;
pub mod state;

// Re-exports
pub use edge::{ConditionalEdges, Edge, Router, END, START};
pub use error::{GraphError, GraphResult};
pub use graph::{CompiledGraph, GraphBuilder};
pub use node::{FunctionNode, Node, NodeError};
pub use persistence::{CheckpointError, Checkpointer, FileCheckpointer, InMemoryCheckpointer};
pub use state::{
    generate_thread_id, LogUpdate, RunConfig, RunReport, StatePatch, Update, WorkflowState,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        CompiledGraph, GraphBuilder, GraphError, GraphResult, LogUpdate, Node, NodeError,
        Router, RunConfig, RunReport, StatePatch, Update, WorkflowState, END, START,
    };
}
