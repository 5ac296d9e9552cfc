//! Object workflow state and patch.

use appweaver_core::{ChangeAction, ExecutionResult, WorkflowFailure};
use appweaver_graph::{StatePatch, Update, WorkflowState};
use serde::{Deserialize, Serialize};

/// The operation the classify stage settled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectOperation {
    /// Change verb.
    pub action: ChangeAction,
    /// Object name the verb applies to.
    pub target: String,
}

/// One field of a designed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within the object.
    pub name: String,
    /// Platform type name.
    pub field_type: String,
    /// Whether the field is mandatory.
    pub required: bool,
}

/// The design stage's output: the object and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    /// Object name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Fields to create alongside the object.
    pub fields: Vec<FieldSpec>,
}

/// Private state of one object workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectState {
    /// Focused restatement of the intent being served.
    pub request: String,
    /// Session identity, carried from the coordinator.
    pub session_id: String,
    /// Name of the last node that produced a patch.
    pub current_node: String,
    /// Classified operation.
    pub operation: Option<ObjectOperation>,
    /// Designed specification.
    pub spec: Option<ObjectSpec>,
    /// True once the spec passed validation.
    pub validated: bool,
    /// Outcome of the latest execute attempt. A `Partial` status here is
    /// what a retried execute resumes from.
    pub execution: Option<ExecutionResult>,
    /// Retry handler entries this run.
    pub retry_count: u32,
    /// Last recorded failure, if any.
    pub error: Option<WorkflowFailure>,
    /// True once a terminal handler ran.
    pub is_completed: bool,
}

/// Partial update to [`ObjectState`].
#[derive(Debug, Default)]
pub struct ObjectPatch {
    /// See [`ObjectState::request`].
    pub request: Update<String>,
    /// See [`ObjectState::session_id`].
    pub session_id: Update<String>,
    /// See [`ObjectState::current_node`].
    pub current_node: Update<String>,
    /// See [`ObjectState::operation`].
    pub operation: Update<Option<ObjectOperation>>,
    /// See [`ObjectState::spec`].
    pub spec: Update<Option<ObjectSpec>>,
    /// See [`ObjectState::validated`].
    pub validated: Update<bool>,
    /// See [`ObjectState::execution`].
    pub execution: Update<Option<ExecutionResult>>,
    /// See [`ObjectState::retry_count`].
    pub retry_count: Update<u32>,
    /// See [`ObjectState::error`].
    pub error: Update<Option<WorkflowFailure>>,
    /// See [`ObjectState::is_completed`].
    pub is_completed: Update<bool>,
}

impl ObjectPatch {
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

impl StatePatch for ObjectPatch {
    fn for_node_error(node: &str, message: &str) -> Self {
        Self {
            current_node: Update::set(node.to_string()),
            error: Update::set(Some(WorkflowFailure::transient(message))),
            ..Self::default()
        }
    }
}

impl WorkflowState for ObjectState {
    type Patch = ObjectPatch;

    fn apply(&mut self, patch: ObjectPatch) {
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

    fn spec() -> ObjectSpec {
        ObjectSpec {
            name: "invoice".to_string(),
            description: "invoice records".to_string(),
            fields: vec![FieldSpec {
                name: "amount".to_string(),
                field_type: "number".to_string(),
                required: true,
            }],
        }
    }

    #[test]
    fn test_reset_all_clears_residue() {
        let mut state = ObjectState::default();
        state.spec = Some(spec());
        state.execution = Some(ExecutionResult::success());
        state.is_completed = true;

        state.apply(ObjectPatch::reset_all());
        assert!(state.spec.is_none());
        assert!(state.execution.is_none());
        assert!(!state.is_completed);
    }

    #[test]
    fn test_serde_round_trip_with_fields() {
        let mut state = ObjectState::default();
        state.spec = Some(spec());
        let json = serde_json::to_string(&state).unwrap();
        let back: ObjectState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.spec, state.spec);
    }
}
