//! Execution results for side-effecting platform operations.
//!
//! A multi-step operation (create object, then one step per field) records
//! every step that succeeded so a retry can resume without repeating
//! already-successful writes.

use serde::{Deserialize, Serialize};

/// Outcome class of an execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Every step succeeded.
    Success,
    /// Some steps succeeded, some failed; resumable.
    Partial,
    /// No step succeeded.
    Failed,
}

/// What a completed step created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// The containing application.
    Application,
    /// The object itself.
    Object,
    /// One field on an object.
    Field,
}

/// A step that already succeeded within a multi-step operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedStep {
    /// What the step created.
    pub kind: StepKind,
    /// Position of the step in the operation's plan.
    pub index: usize,
    /// Identifier of the created entity.
    pub entity_id: String,
}

/// Outcome of a side-effecting operation against the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionResult {
    /// Overall outcome class.
    pub status: Option<ExecutionStatus>,
    /// Id of the application touched, if any.
    pub application_id: Option<String>,
    /// Id of the object touched, if any.
    pub object_id: Option<String>,
    /// Errors collected from failed steps.
    pub errors: Vec<String>,
    /// Steps that succeeded, for resuming.
    pub completed_steps: Vec<CompletedStep>,
}

impl ExecutionResult {
    /// A fully successful result.
    pub fn success() -> Self {
        Self {
            status: Some(ExecutionStatus::Success),
            ..Self::default()
        }
    }

    /// A partial result carrying the steps that did succeed.
    pub fn partial(completed_steps: Vec<CompletedStep>, errors: Vec<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Partial),
            completed_steps,
            errors,
            ..Self::default()
        }
    }

    /// A total failure: zero completed steps.
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            status: Some(ExecutionStatus::Failed),
            errors,
            ..Self::default()
        }
    }

    /// Attach the application id.
    pub fn with_application_id(mut self, id: impl Into<String>) -> Self {
        self.application_id = Some(id.into());
        self
    }

    /// Attach the object id.
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    /// Attach completed steps.
    pub fn with_completed_steps(mut self, steps: Vec<CompletedStep>) -> Self {
        self.completed_steps = steps;
        self
    }

    /// True if a step at `index` already succeeded.
    pub fn is_step_completed(&self, index: usize) -> bool {
        self.completed_steps.iter().any(|s| s.index == index)
    }

    /// Entity id recorded for a completed step of the given kind, if any.
    pub fn completed_entity(&self, kind: StepKind) -> Option<&str> {
        self.completed_steps
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.entity_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = ExecutionResult::success().with_application_id("app_1");
        assert_eq!(result.status, Some(ExecutionStatus::Success));
        assert_eq!(result.application_id.as_deref(), Some("app_1"));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_partial_resume_bookkeeping() {
        let result = ExecutionResult::partial(
            vec![CompletedStep {
                kind: StepKind::Object,
                index: 0,
                entity_id: "obj_1".to_string(),
            }],
            vec!["field 'amount' rejected".to_string()],
        );

        assert!(result.is_step_completed(0));
        assert!(!result.is_step_completed(1));
        assert_eq!(result.completed_entity(StepKind::Object), Some("obj_1"));
        assert_eq!(result.completed_entity(StepKind::Field), None);
    }

    #[test]
    fn test_failed_result_has_no_completed_steps() {
        let result = ExecutionResult::failed(vec!["platform rejected request".to_string()]);
        assert_eq!(result.status, Some(ExecutionStatus::Failed));
        assert!(result.completed_steps.is_empty());
    }

    #[test]
    fn test_serde_round_trip() {
        let result = ExecutionResult::partial(
            vec![CompletedStep {
                kind: StepKind::Field,
                index: 2,
                entity_id: "fld_2".to_string(),
            }],
            vec![],
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: ExecutionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
