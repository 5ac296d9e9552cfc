//! Coordinator state and patch.
//!
//! Fields fall into the three merge categories: merge-once (the request
//! text and session id, set by the service seed), overwrite-latest (scalar
//! scratch), and accumulating (transcript, processed indices, error
//! records). Session-scoped totals survive the per-request reset; scratch
//! does not.

use appweaver_core::{
    ExecutionResult, Intent, IntentDependency, WorkflowFailure,
};
use appweaver_graph::{LogUpdate, StatePatch, Update, WorkflowState};
use serde::{Deserialize, Serialize};

/// What the sequencer decided on its last pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerDecision {
    /// Loop back into the sequencer (redirect or passthrough happened).
    Continue,
    /// Hand the current intent to the named domain's sub-graph.
    Dispatch(appweaver_core::Domain),
    /// Every intent is processed.
    Done,
}

/// One structured error record accumulated on the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentErrorRecord {
    /// The failing intent's id, or a generated error id when no intent was
    /// current.
    pub id: String,
    /// What failed.
    pub message: String,
}

/// State for one coordinator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorState {
    /// The incoming request text. Merge-once per request.
    pub user_message: String,
    /// Session identity, shared with every sub-graph invocation.
    pub session_id: String,
    /// Name of the last node that produced a patch.
    pub current_node: String,
    /// The classified intent batch.
    pub intents: Vec<Intent>,
    /// Dependency edges over the batch, acyclic by construction.
    pub dependencies: Vec<IntentDependency>,
    /// Index of the intent being considered.
    pub current_intent_index: usize,
    /// Indices marked processed, each exactly once.
    pub processed_intents: Vec<usize>,
    /// The sequencer's latest routing decision.
    pub decision: Option<SequencerDecision>,
    /// Structured error records for failed intents.
    pub intent_errors: Vec<IntentErrorRecord>,
    /// Execution results collected from sub-graphs.
    pub execution_results: Vec<ExecutionResult>,
    /// Session-scoped conversation log.
    pub transcript: Vec<String>,
    /// Applications created across the whole session.
    pub applications_created: u32,
    /// Objects created across the whole session.
    pub objects_created: u32,
    /// Retry handler entries this request.
    pub retry_count: u32,
    /// Last recorded failure, if any.
    pub error: Option<WorkflowFailure>,
    /// True once a terminal handler ran.
    pub is_completed: bool,
}

impl CoordinatorState {
    /// The intent at the current index, if any.
    pub fn current_intent(&self) -> Option<&Intent> {
        self.intents.get(self.current_intent_index)
    }

    /// True if the given index was marked processed.
    pub fn is_processed(&self, index: usize) -> bool {
        self.processed_intents.contains(&index)
    }

    /// First unprocessed dependency of the given intent index, if any.
    pub fn unprocessed_dependency_of(&self, index: usize) -> Option<usize> {
        self.dependencies
            .iter()
            .find(|d| d.dependent == index && !self.is_processed(d.depends_on))
            .map(|d| d.depends_on)
    }
}

/// Partial update to [`CoordinatorState`].
#[derive(Debug, Default)]
pub struct CoordinatorPatch {
    /// See [`CoordinatorState::user_message`].
    pub user_message: Update<String>,
    /// See [`CoordinatorState::session_id`].
    pub session_id: Update<String>,
    /// See [`CoordinatorState::current_node`].
    pub current_node: Update<String>,
    /// See [`CoordinatorState::intents`].
    pub intents: Update<Vec<Intent>>,
    /// See [`CoordinatorState::dependencies`].
    pub dependencies: Update<Vec<IntentDependency>>,
    /// See [`CoordinatorState::current_intent_index`].
    pub current_intent_index: Update<usize>,
    /// Appended with de-duplication; an index is recorded once.
    pub processed_intents: LogUpdate<usize>,
    /// See [`CoordinatorState::decision`].
    pub decision: Update<Option<SequencerDecision>>,
    /// Accumulating error records.
    pub intent_errors: LogUpdate<IntentErrorRecord>,
    /// Accumulating execution results.
    pub execution_results: LogUpdate<ExecutionResult>,
    /// Accumulating session transcript.
    pub transcript: LogUpdate<String>,
    /// See [`CoordinatorState::applications_created`].
    pub applications_created: Update<u32>,
    /// See [`CoordinatorState::objects_created`].
    pub objects_created: Update<u32>,
    /// See [`CoordinatorState::retry_count`].
    pub retry_count: Update<u32>,
    /// See [`CoordinatorState::error`].
    pub error: Update<Option<WorkflowFailure>>,
    /// See [`CoordinatorState::is_completed`].
    pub is_completed: Update<bool>,
}

impl StatePatch for CoordinatorPatch {
    fn for_node_error(node: &str, message: &str) -> Self {
        Self {
            current_node: Update::set(node.to_string()),
            error: Update::set(Some(WorkflowFailure::transient(message))),
            ..Self::default()
        }
    }
}

impl WorkflowState for CoordinatorState {
    type Patch = CoordinatorPatch;

    fn apply(&mut self, patch: CoordinatorPatch) {
        patch.user_message.apply(&mut self.user_message);
        patch.session_id.apply(&mut self.session_id);
        patch.current_node.apply(&mut self.current_node);
        patch.intents.apply(&mut self.intents);
        patch.dependencies.apply(&mut self.dependencies);
        patch
            .current_intent_index
            .apply(&mut self.current_intent_index);
        patch
            .processed_intents
            .apply_dedup(&mut self.processed_intents);
        patch.decision.apply(&mut self.decision);
        patch.intent_errors.apply(&mut self.intent_errors);
        patch.execution_results.apply(&mut self.execution_results);
        patch.transcript.apply(&mut self.transcript);
        patch
            .applications_created
            .apply(&mut self.applications_created);
        patch.objects_created.apply(&mut self.objects_created);
        patch.retry_count.apply(&mut self.retry_count);
        patch.error.apply(&mut self.error);
        patch.is_completed.apply(&mut self.is_completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appweaver_core::{Domain, IntentKind};

    fn intent() -> Intent {
        Intent::new(
            Domain::Application,
            IntentKind::CreateApplication,
            vec!["crm".to_string()],
            "a crm app",
        )
    }

    #[test]
    fn test_processed_intents_dedup() {
        let mut state = CoordinatorState::default();
        state.apply(CoordinatorPatch {
            processed_intents: LogUpdate::push(0),
            ..CoordinatorPatch::default()
        });
        state.apply(CoordinatorPatch {
            processed_intents: LogUpdate::Append(vec![0, 1]),
            ..CoordinatorPatch::default()
        });
        assert_eq!(state.processed_intents, vec![0, 1]);
    }

    #[test]
    fn test_transcript_grows_monotonically() {
        let mut state = CoordinatorState::default();
        for i in 0..3 {
            let before = state.transcript.len();
            state.apply(CoordinatorPatch {
                transcript: LogUpdate::push(format!("line {i}")),
                ..CoordinatorPatch::default()
            });
            assert!(state.transcript.len() > before);
        }
    }

    #[test]
    fn test_reset_restores_defaults_regardless_of_contents() {
        let mut state = CoordinatorState::default();
        state.apply(CoordinatorPatch {
            intents: Update::set(vec![intent(), intent()]),
            retry_count: Update::set(7),
            intent_errors: LogUpdate::push(IntentErrorRecord {
                id: "err_1".to_string(),
                message: "boom".to_string(),
            }),
            ..CoordinatorPatch::default()
        });

        state.apply(CoordinatorPatch {
            intents: Update::Reset,
            retry_count: Update::Reset,
            intent_errors: LogUpdate::Reset,
            ..CoordinatorPatch::default()
        });

        assert!(state.intents.is_empty());
        assert_eq!(state.retry_count, 0);
        assert!(state.intent_errors.is_empty());
    }

    #[test]
    fn test_session_totals_survive_request_reset() {
        let mut state = CoordinatorState::default();
        state.apply(CoordinatorPatch {
            objects_created: Update::set(4),
            retry_count: Update::set(1),
            ..CoordinatorPatch::default()
        });

        // Per-request scratch reset keeps the session accumulator.
        state.apply(CoordinatorPatch {
            retry_count: Update::Reset,
            error: Update::Reset,
            ..CoordinatorPatch::default()
        });

        assert_eq!(state.objects_created, 4);
        assert_eq!(state.retry_count, 0);
    }

    #[test]
    fn test_unprocessed_dependency_lookup() {
        let mut state = CoordinatorState::default();
        state.intents = vec![intent(), intent()];
        state.dependencies = vec![IntentDependency {
            dependent: 1,
            depends_on: 0,
        }];

        assert_eq!(state.unprocessed_dependency_of(1), Some(0));
        state.processed_intents.push(0);
        assert_eq!(state.unprocessed_dependency_of(1), None);
    }

    #[test]
    fn test_for_node_error_records_transient_failure() {
        let patch = CoordinatorPatch::for_node_error("classify", "provider timeout");
        let mut state = CoordinatorState::default();
        state.apply(patch);
        let failure = state.error.expect("failure recorded");
        assert!(failure.is_transient());
        assert_eq!(state.current_node, "classify");
    }

    #[test]
    fn test_state_serde_round_trip() {
        let mut state = CoordinatorState::default();
        state.intents = vec![intent()];
        state.decision = Some(SequencerDecision::Dispatch(Domain::Application));
        let json = serde_json::to_string(&state).unwrap();
        let back: CoordinatorState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.intents.len(), 1);
        assert_eq!(
            back.decision,
            Some(SequencerDecision::Dispatch(Domain::Application))
        );
    }
}
