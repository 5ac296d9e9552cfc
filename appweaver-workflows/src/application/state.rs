//! Application workflow state and patch.

use appweaver_core::{ChangeAction, ExecutionResult, WorkflowFailure};
use appweaver_graph::{StatePatch, Update, WorkflowState};
use serde::{Deserialize, Serialize};

/// The operation the classify stage settled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationOperation {
    /// Change verb.
    pub action: ChangeAction,
    /// Application name the verb applies to.
    pub target: String,
}

/// The design stage's output: what to send to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSpec {
    /// Application name.
    pub name: String,
    /// Short description.
    pub description: String,
}

/// Private state of one application workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationState {
    /// Focused restatement of the intent being served.
    pub request: String,
    /// Session identity, carried from the coordinator.
    pub session_id: String,
    /// Name of the last node that produced a patch.
    pub current_node: String,
    /// Classified operation.
    pub operation: Option<ApplicationOperation>,
    /// Designed specification.
    pub spec: Option<ApplicationSpec>,
    /// True once the spec passed validation.
    pub validated: bool,
    /// Outcome of the execute stage.
    pub execution: Option<ExecutionResult>,
    /// Retry handler entries this run.
    pub retry_count: u32,
    /// Last recorded failure, if any.
    pub error: Option<WorkflowFailure>,
    /// True once a terminal handler ran.
    pub is_completed: bool,
}

/// Partial update to [`ApplicationState`].
#[derive(Debug, Default)]
pub struct ApplicationPatch {
    /// See [`ApplicationState::request`].
    pub request: Update<String>,
    /// See [`ApplicationState::session_id`].
    pub session_id: Update<String>,
    /// See [`ApplicationState::current_node`].
    pub current_node: Update<String>,
    /// See [`ApplicationState::operation`].
    pub operation: Update<Option<ApplicationOperation>>,
    /// See [`ApplicationState::spec`].
    pub spec: Update<Option<ApplicationSpec>>,
    /// See [`ApplicationState::validated`].
    pub validated: Update<bool>,
    /// See [`ApplicationState::execution`].
    pub execution: Update<Option<ExecutionResult>>,
    /// See [`ApplicationState::retry_count`].
    pub retry_count: Update<u32>,
    /// See [`ApplicationState::error`].
    pub error: Update<Option<WorkflowFailure>>,
    /// See [`ApplicationState::is_completed`].
    pub is_completed: Update<bool>,
}

impl ApplicationPatch {
    /// A patch resetting every field, for seeding a fresh run.
    pub fn reset_all() -> Self {
        Self {
            request: Update::Reset,
            session_id: Update::Reset,
            current_node: Update::Reset,
            operation: Update::Reset,
            spec: Update::Reset,
            validated: Update::Reset,
            execution: Update::Reset,
            retry_count: Update::Reset,
            error: Update::Reset,
            is_completed: Update::Reset,
        }
    }
}

impl StatePatch for ApplicationPatch {
    fn for_node_error(node: &str, message: &str) -> Self {
        Self {
            current_node: Update::set(node.to_string()),
            error: Update::set(Some(WorkflowFailure::transient(message))),
            ..Self::default()
        }
    }
}

impl WorkflowState for ApplicationState {
    type Patch = ApplicationPatch;

    fn apply(&mut self, patch: ApplicationPatch) {
        patch.request.apply(&mut self.request);
        patch.session_id.apply(&mut self.session_id);
        patch.current_node.apply(&mut self.current_node);
        patch.operation.apply(&mut self.operation);
        patch.spec.apply(&mut self.spec);
        patch.validated.apply(&mut self.validated);
        patch.execution.apply(&mut self.execution);
        patch.retry_count.apply(&mut self.retry_count);
        patch.error.apply(&mut self.error);
        patch.is_completed.apply(&mut self.is_completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_all_clears_residue() {
        let mut state = ApplicationState::default();
        state.spec = Some(ApplicationSpec {
            name: "crm".to_string(),
            description: "a crm".to_string(),
        });
        state.retry_count = 2;
        state.is_completed = true;

        state.apply(ApplicationPatch::reset_all());
        assert!(state.spec.is_none());
        assert_eq!(state.retry_count, 0);
        assert!(!state.is_completed);
    }

    #[test]
    fn test_for_node_error_is_transient() {
        let mut state = ApplicationState::default();
        state.apply(ApplicationPatch::for_node_error("execute", "oops"));
        assert!(state.error.unwrap().is_transient());
        assert_eq!(state.current_node, "execute");
    }

    #[test]
    fn test_serde_round_trip() {
        let mut state = ApplicationState::default();
        state.operation = Some(ApplicationOperation {
            action: ChangeAction::Create,
            target: "crm".to_string(),
        });
        let json = serde_json::to_string(&state).unwrap();
        let back: ApplicationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.operation, state.operation);
    }
}
