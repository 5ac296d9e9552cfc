//! Sub-graph wrapper: runs a domain workflow as one coordinator node.
//!
//! The wrapper owns the boundary between the coordinator's state and a
//! domain workflow's private state. A [`DomainBridge`] supplies the
//! translation in both directions plus validation on each side; the
//! [`SubgraphNode`] drives the inner run and contains its failures. A
//! failed domain run becomes one structured error record on the
//! coordinator, the intent is marked processed, and the sequencer moves
//! on. One broken intent never takes down the batch.

use crate::coordinator::state::{CoordinatorPatch, CoordinatorState, IntentErrorRecord};
use appweaver_core::{generate_error_id, Domain};
use appweaver_graph::{
    CompiledGraph, LogUpdate, Node, NodeError, RunConfig, Update, WorkflowState,
};
use async_trait::async_trait;
use tracing::{info, warn};

/// Translation layer between the coordinator and one domain workflow.
pub trait DomainBridge: Send + Sync + 'static {
    /// The domain workflow's private state type.
    type Inner: WorkflowState;

    /// The domain this bridge serves. Its label doubles as the wrapper
    /// node's name and routing edge label.
    fn domain(&self) -> Domain;

    /// Check that the coordinator state carries what the domain run needs:
    /// a current intent in this bridge's domain and a non-empty request.
    fn validate_context(&self, state: &CoordinatorState) -> Result<(), String>;

    /// Build the seed patch for a fresh inner run. Implementations reset
    /// every private field so no residue leaks between intents.
    fn subgraph_seed(&self, state: &CoordinatorState) -> <Self::Inner as WorkflowState>::Patch;

    /// The compiled domain workflow.
    fn graph(&self) -> &CompiledGraph<Self::Inner>;

    /// Check the finished inner state: an execution result must be present
    /// with a recognized status, and successful statuses must carry ids.
    fn validate_results(&self, inner: &Self::Inner) -> Result<(), String>;

    /// Fold a validated inner run back into the coordinator: append the
    /// execution result, mark the intent processed, advance the index, and
    /// bump session counters.
    fn coordinator_patch(
        &self,
        state: &CoordinatorState,
        inner: &Self::Inner,
    ) -> CoordinatorPatch;
}

/// Coordinator node wrapping one domain workflow behind a [`DomainBridge`].
pub struct SubgraphNode<B: DomainBridge> {
    bridge: B,
}

impl<B: DomainBridge> SubgraphNode<B> {
    /// Wrap a bridge.
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    /// The containment patch: one error record for the current intent, mark
    /// it processed, advance. No coordinator-level failure is recorded, so
    /// routing continues to the next intent.
    fn contained(&self, state: &CoordinatorState, message: String) -> CoordinatorPatch {
        let index = state.current_intent_index;
        let id = state
            .current_intent()
            .map(|intent| intent.id.clone())
            .unwrap_or_else(generate_error_id);
        warn!(domain = %self.bridge.domain(), index, %message, "domain run contained");
        CoordinatorPatch {
            current_node: Update::set(self.bridge.domain().label().to_string()),
            intent_errors: LogUpdate::push(IntentErrorRecord {
                id,
                message: message.clone(),
            }),
            processed_intents: LogUpdate::push(index),
            current_intent_index: Update::set(index + 1),
            transcript: LogUpdate::push(format!("assistant: intent {index} failed: {message}")),
            ..CoordinatorPatch::default()
        }
    }
}

#[async_trait]
impl<B: DomainBridge> Node<CoordinatorState> for SubgraphNode<B> {
    fn name(&self) -> &str {
        self.bridge.domain().label()
    }

    async fn run(&self, state: &CoordinatorState) -> Result<CoordinatorPatch, NodeError> {
        if let Err(message) = self.bridge.validate_context(state) {
            return Ok(self.contained(state, message));
        }

        let seed = self.bridge.subgraph_seed(state);
        // Each intent gets a fresh inner run; inner graphs carry no
        // checkpointer, so the generated thread id is throwaway.
        let report = match self.bridge.graph().invoke(seed, RunConfig::default()).await {
            Ok(report) => report,
            Err(error) => {
                return Ok(self.contained(state, format!("domain workflow aborted: {error}")));
            }
        };

        if let Err(message) = self.bridge.validate_results(&report.state) {
            return Ok(self.contained(state, message));
        }

        info!(domain = %self.bridge.domain(), steps = report.steps, "domain run finished");
        Ok(self.bridge.coordinator_patch(state, &report.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appweaver_core::{ExecutionResult, Intent, IntentKind};
    use appweaver_graph::{FunctionNode, GraphBuilder, StatePatch, END};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct InnerState {
        request: String,
        produced: bool,
        error: Option<String>,
    }

    #[derive(Debug, Default)]
    struct InnerPatch {
        request: Update<String>,
        produced: Update<bool>,
        error: Update<Option<String>>,
    }

    impl StatePatch for InnerPatch {
        fn for_node_error(_node: &str, message: &str) -> Self {
            Self {
                error: Update::set(Some(message.to_string())),
                ..Self::default()
            }
        }
    }

    impl WorkflowState for InnerState {
        type Patch = InnerPatch;

        fn apply(&mut self, patch: InnerPatch) {
            patch.request.apply(&mut self.request);
            patch.produced.apply(&mut self.produced);
            patch.error.apply(&mut self.error);
        }
    }

    fn inner_graph(max_steps: u32) -> CompiledGraph<InnerState> {
        GraphBuilder::<InnerState>::new("inner")
            .node(
                "work",
                FunctionNode::new("work", |_: InnerState| async move {
                    Ok::<_, NodeError>(InnerPatch {
                        produced: Update::set(true),
                        ..InnerPatch::default()
                    })
                }),
            )
            .entry("work")
            .edge("work", END)
            .max_steps(max_steps)
            .build()
            .unwrap()
    }

    struct TestBridge {
        graph: CompiledGraph<InnerState>,
        reject_context: bool,
        reject_results: bool,
    }

    impl TestBridge {
        fn new(max_steps: u32) -> Self {
            Self {
                graph: inner_graph(max_steps),
                reject_context: false,
                reject_results: false,
            }
        }
    }

    impl DomainBridge for TestBridge {
        type Inner = InnerState;

        fn domain(&self) -> Domain {
            Domain::Object
        }

        fn validate_context(&self, state: &CoordinatorState) -> Result<(), String> {
            if self.reject_context || state.current_intent().is_none() {
                return Err("no current intent for domain 'object'".to_string());
            }
            Ok(())
        }

        fn subgraph_seed(&self, state: &CoordinatorState) -> InnerPatch {
            InnerPatch {
                request: Update::set(state.user_message.clone()),
                produced: Update::Reset,
                error: Update::Reset,
            }
        }

        fn graph(&self) -> &CompiledGraph<InnerState> {
            &self.graph
        }

        fn validate_results(&self, inner: &InnerState) -> Result<(), String> {
            if self.reject_results || !inner.produced {
                return Err("domain run produced no execution result".to_string());
            }
            Ok(())
        }

        fn coordinator_patch(
            &self,
            state: &CoordinatorState,
            _inner: &InnerState,
        ) -> CoordinatorPatch {
            CoordinatorPatch {
                execution_results: LogUpdate::push(ExecutionResult::success()),
                processed_intents: LogUpdate::push(state.current_intent_index),
                current_intent_index: Update::set(state.current_intent_index + 1),
                ..CoordinatorPatch::default()
            }
        }
    }

    fn state_with_intent() -> CoordinatorState {
        let mut state = CoordinatorState::default();
        state.user_message = "add an invoice object".to_string();
        state.intents = vec![Intent::new(
            Domain::Object,
            IntentKind::CreateObject,
            vec!["invoice".to_string()],
            "invoice records",
        )];
        state
    }

    #[tokio::test]
    async fn test_successful_run_folds_back() {
        let node = SubgraphNode::new(TestBridge::new(10));
        let mut state = state_with_intent();

        state.apply(node.run(&state).await.unwrap());
        assert_eq!(state.execution_results.len(), 1);
        assert_eq!(state.processed_intents, vec![0]);
        assert_eq!(state.current_intent_index, 1);
        assert!(state.intent_errors.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_context_is_contained() {
        let mut bridge = TestBridge::new(10);
        bridge.reject_context = true;
        let node = SubgraphNode::new(bridge);
        let mut state = state_with_intent();
        let intent_id = state.intents[0].id.clone();

        state.apply(node.run(&state).await.unwrap());
        assert_eq!(state.intent_errors.len(), 1);
        assert_eq!(state.intent_errors[0].id, intent_id);
        assert_eq!(state.processed_intents, vec![0]);
        assert_eq!(state.current_intent_index, 1);
        // The batch continues: no coordinator-level failure.
        assert!(state.error.is_none());
        assert!(state.execution_results.is_empty());
    }

    #[tokio::test]
    async fn test_inner_graph_abort_is_contained() {
        // A zero-step ceiling makes the inner run abort immediately.
        let node = SubgraphNode::new(TestBridge::new(0));
        let mut state = state_with_intent();

        state.apply(node.run(&state).await.unwrap());
        assert_eq!(state.intent_errors.len(), 1);
        assert!(state.intent_errors[0].message.contains("aborted"));
        assert_eq!(state.current_intent_index, 1);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_rejected_results_are_contained() {
        let mut bridge = TestBridge::new(10);
        bridge.reject_results = true;
        let node = SubgraphNode::new(bridge);
        let mut state = state_with_intent();

        state.apply(node.run(&state).await.unwrap());
        assert_eq!(state.intent_errors.len(), 1);
        assert!(state.intent_errors[0]
            .message
            .contains("no execution result"));
    }

    #[tokio::test]
    async fn test_node_name_is_domain_label() {
        let node = SubgraphNode::new(TestBridge::new(10));
        assert_eq!(node.name(), "object");
    }
}
