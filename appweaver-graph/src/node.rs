//! Workflow node types.

use crate::state::{StatePatch, WorkflowState};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

/// Failure raised out of a node's `run`.
///
/// Nodes encode *expected* failures (collaborator errors, validation
/// problems) inside the returned patch; `NodeError` is reserved for defects.
/// The executor converts it into [`StatePatch::for_node_error`] so the run
/// still reaches a terminal node.
#[derive(Debug, thiserror::Error)]
#[error("node '{node}' failed: {message}")]
pub struct NodeError {
    /// The node that failed.
    pub node: String,
    /// What went wrong.
    pub message: String,
}

impl NodeError {
    /// Create a new node error.
    pub fn new(node: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            node: node.into(),
            message: message.to_string(),
        }
    }
}

/// A single unit of work in a workflow graph.
///
/// `run` is a function of the current state plus external collaborator calls
/// only; side effects happen at most once per invocation. Retries re-enter
/// the node through routing, never resume mid-node.
#[async_trait]
pub trait Node<S: WorkflowState>: Send + Sync {
    /// The node's registered name.
    fn name(&self) -> &str;

    /// Execute the node against the current state, producing a patch.
    async fn run(&self, state: &S) -> Result<S::Patch, NodeError>;
}

/// A node backed by an async function.
pub struct FunctionNode<S, F, Fut>
where
    S: WorkflowState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S::Patch, NodeError>> + Send,
{
    name: String,
    func: F,
    _phantom: PhantomData<fn() -> S>,
}

impl<S, F, Fut> FunctionNode<S, F, Fut>
where
    S: WorkflowState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S::Patch, NodeError>> + Send,
{
    /// Create a new function node.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FunctionNode<S, F, Fut>
where
    S: WorkflowState,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S::Patch, NodeError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: &S) -> Result<S::Patch, NodeError> {
        (self.func)(state.clone()).await
    }
}
