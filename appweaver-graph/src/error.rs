//! Engine error types.

use thiserror::Error;

/// Errors raised while building or running a workflow graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// No entry point configured.
    #[error("No entry point defined for graph '{0}'")]
    NoEntryPoint(String),

    /// A node was registered twice under the same name.
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    /// An edge or router references a node that was never registered.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A node has both an unconditional edge and a conditional edge table.
    #[error("Node '{0}' has conflicting outgoing edges")]
    ConflictingEdges(String),

    /// A node has no outgoing edge at all.
    #[error("Node '{0}' has no outgoing edge; terminal nodes must edge to END")]
    DeadEnd(String),

    /// A router's declared labels and its wired targets do not match exactly.
    #[error("Router on '{node}' label mismatch: {detail}")]
    LabelMismatch {
        /// Source node of the conditional edge.
        node: String,
        /// What differs between declared labels and wired targets.
        detail: String,
    },

    /// A router returned a label that was never declared.
    #[error("Router on '{node}' returned unwired label '{label}'")]
    UnwiredLabel {
        /// Source node of the conditional edge.
        node: String,
        /// The offending label.
        label: String,
    },

    /// The run exceeded the configured step ceiling.
    #[error("Maximum steps exceeded: {0}")]
    MaxStepsExceeded(u32),

    /// Checkpoint store failure.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Other error.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl GraphError {
    /// Create a node not found error.
    pub fn node_not_found(name: impl Into<String>) -> Self {
        Self::NodeNotFound(name.into())
    }

    /// Create a label mismatch error.
    pub fn label_mismatch(node: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::LabelMismatch {
            node: node.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
