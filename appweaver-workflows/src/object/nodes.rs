//! Object workflow nodes.
//!
//! The execute stage is the multi-step one: creating an object is one
//! platform write for the object itself plus one per field, and a retry
//! resumes from the recorded completed steps instead of repeating writes
//! that already succeeded.

use crate::object::state::{FieldSpec, ObjectOperation, ObjectPatch, ObjectSpec, ObjectState};
use crate::prompts;
use crate::routing::RetryPolicy;
use appweaver_core::{
    ChangeAction, ChangeRequest, ChatMessage, CompletedStep, ExecutionResult, ExecutionStatus,
    PlatformClient, PlatformError, ResourceKind, StepKind, StructuredExtractor, WorkflowFailure,
};
use appweaver_graph::{Node, NodeError, Update};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Node names used when wiring the object graph.
pub mod names {
    /// Operation classification node.
    pub const CLASSIFY_OPERATION: &str = "classify_operation";
    /// Design node.
    pub const DESIGN: &str = "design";
    /// Validation node.
    pub const VALIDATE: &str = "validate";
    /// Execution node.
    pub const EXECUTE: &str = "execute";
    /// Success terminal handler.
    pub const SUCCESS: &str = "success";
    /// Error terminal handler.
    pub const ERROR: &str = "error";
    /// Retry handler.
    pub const RETRY: &str = "retry";
}

fn transient(node: &str, message: impl Into<String>) -> ObjectPatch {
    ObjectPatch {
        current_node: Update::set(node.to_string()),
        error: Update::set(Some(WorkflowFailure::transient(message))),
        ..ObjectPatch::default()
    }
}

fn fatal(node: &str, message: impl Into<String>) -> ObjectPatch {
    ObjectPatch {
        current_node: Update::set(node.to_string()),
        error: Update::set(Some(WorkflowFailure::fatal(message))),
        ..ObjectPatch::default()
    }
}

fn parse_action(action: &str) -> Option<ChangeAction> {
    match action {
        "create" => Some(ChangeAction::Create),
        "update" => Some(ChangeAction::Update),
        "delete" => Some(ChangeAction::Delete),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OperationArgs {
    action: String,
    target: String,
}

/// Determines the operation (create/update/delete plus target) via the
/// extraction collaborator.
pub struct ClassifyOperationNode {
    extractor: Arc<dyn StructuredExtractor>,
}

impl ClassifyOperationNode {
    /// Create the node over an extraction collaborator.
    pub fn new(extractor: Arc<dyn StructuredExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Node<ObjectState> for ClassifyOperationNode {
    fn name(&self) -> &str {
        names::CLASSIFY_OPERATION
    }

    async fn run(&self, state: &ObjectState) -> Result<ObjectPatch, NodeError> {
        let messages = [ChatMessage::user(state.request.as_str())];
        let tools = [prompts::classify_object_tool()];

        let invocation = match self
            .extractor
            .extract(prompts::CLASSIFY_OBJECT_PROMPT, &messages, &tools)
            .await
        {
            Ok(invocation) => invocation,
            Err(error) => {
                return Ok(transient(
                    names::CLASSIFY_OPERATION,
                    format!("operation classification failed: {error}"),
                ));
            }
        };
        if invocation.tool_name != tools[0].name {
            return Ok(transient(
                names::CLASSIFY_OPERATION,
                format!("unexpected tool '{}'", invocation.tool_name),
            ));
        }
        let args: OperationArgs = match serde_json::from_value(invocation.args) {
            Ok(args) => args,
            Err(error) => {
                return Ok(transient(
                    names::CLASSIFY_OPERATION,
                    format!("operation arguments malformed: {error}"),
                ));
            }
        };
        let Some(action) = parse_action(&args.action) else {
            return Ok(transient(
                names::CLASSIFY_OPERATION,
                format!("unknown object action '{}'", args.action),
            ));
        };

        debug!(?action, target = %args.target, "classified object operation");
        Ok(ObjectPatch {
            current_node: Update::set(names::CLASSIFY_OPERATION.to_string()),
            operation: Update::set(Some(ObjectOperation {
                action,
                target: args.target,
            })),
            error: Update::Reset,
            ..ObjectPatch::default()
        })
    }
}

#[derive(Debug, Deserialize)]
struct FieldDraft {
    name: String,
    field_type: String,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct ObjectSpecArgs {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    fields: Vec<FieldDraft>,
}

/// Produces the object specification via the extraction collaborator.
pub struct DesignNode {
    extractor: Arc<dyn StructuredExtractor>,
}

impl DesignNode {
    /// Create the node over an extraction collaborator.
    pub fn new(extractor: Arc<dyn StructuredExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Node<ObjectState> for DesignNode {
    fn name(&self) -> &str {
        names::DESIGN
    }

    async fn run(&self, state: &ObjectState) -> Result<ObjectPatch, NodeError> {
        let messages = [ChatMessage::user(state.request.as_str())];
        let tools = [prompts::design_object_tool()];

        let invocation = match self
            .extractor
            .extract(prompts::DESIGN_OBJECT_PROMPT, &messages, &tools)
            .await
        {
            Ok(invocation) => invocation,
            Err(error) => {
                return Ok(transient(names::DESIGN, format!("design failed: {error}")));
            }
        };
        if invocation.tool_name != tools[0].name {
            return Ok(transient(
                names::DESIGN,
                format!("unexpected tool '{}'", invocation.tool_name),
            ));
        }
        let args: ObjectSpecArgs = match serde_json::from_value(invocation.args) {
            Ok(args) => args,
            Err(error) => {
                return Ok(transient(
                    names::DESIGN,
                    format!("design arguments malformed: {error}"),
                ));
            }
        };

        Ok(ObjectPatch {
            current_node: Update::set(names::DESIGN.to_string()),
            spec: Update::set(Some(ObjectSpec {
                name: args.name,
                description: args.description,
                fields: args
                    .fields
                    .into_iter()
                    .map(|f| FieldSpec {
                        name: f.name,
                        field_type: f.field_type,
                        required: f.required,
                    })
                    .collect(),
            })),
            error: Update::Reset,
            ..ObjectPatch::default()
        })
    }
}

/// Checks the designed spec: non-empty names and no duplicate fields.
/// Violations are structural and recorded as fatal.
pub struct ValidateNode;

#[async_trait]
impl Node<ObjectState> for ValidateNode {
    fn name(&self) -> &str {
        names::VALIDATE
    }

    async fn run(&self, state: &ObjectState) -> Result<ObjectPatch, NodeError> {
        let Some(spec) = &state.spec else {
            return Ok(fatal(names::VALIDATE, "no specification to validate"));
        };
        if spec.name.trim().is_empty() {
            return Ok(fatal(names::VALIDATE, "object name must not be empty"));
        }
        let mut seen = HashSet::new();
        for field in &spec.fields {
            if field.name.trim().is_empty() {
                return Ok(fatal(names::VALIDATE, "field name must not be empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Ok(fatal(
                    names::VALIDATE,
                    format!("duplicate field name '{}'", field.name),
                ));
            }
        }
        Ok(ObjectPatch {
            current_node: Update::set(names::VALIDATE.to_string()),
            validated: Update::set(true),
            error: Update::Reset,
            ..ObjectPatch::default()
        })
    }
}

/// Applies the object change as a step plan against the platform.
///
/// Create plans step 0 for the object and one step per field; update and
/// delete are a single object step. A prior `Partial` execution result is
/// the resume point: its completed steps are skipped and its object id
/// reused, so no successful write ever repeats.
pub struct ExecuteNode {
    platform: Arc<dyn PlatformClient>,
}

impl ExecuteNode {
    /// Create the node over a platform client.
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }
}

struct PlannedStep {
    kind: StepKind,
    index: usize,
    request: ChangeRequest,
}

fn plan(operation: &ObjectOperation, spec: &ObjectSpec) -> Vec<PlannedStep> {
    let mut steps = vec![PlannedStep {
        kind: StepKind::Object,
        index: 0,
        request: ChangeRequest::new(
            ResourceKind::Object,
            operation.action,
            json!({
                "name": spec.name,
                "description": spec.description,
                "target": operation.target,
            }),
        ),
    }];
    if operation.action == ChangeAction::Create {
        for (offset, field) in spec.fields.iter().enumerate() {
            steps.push(PlannedStep {
                kind: StepKind::Field,
                index: offset + 1,
                request: ChangeRequest::new(
                    ResourceKind::Field,
                    ChangeAction::Create,
                    json!({
                        "name": field.name,
                        "field_type": field.field_type,
                        "required": field.required,
                    }),
                ),
            });
        }
    }
    steps
}

#[async_trait]
impl Node<ObjectState> for ExecuteNode {
    fn name(&self) -> &str {
        names::EXECUTE
    }

    async fn run(&self, state: &ObjectState) -> Result<ObjectPatch, NodeError> {
        let (Some(operation), Some(spec)) = (&state.operation, &state.spec) else {
            return Ok(transient(names::EXECUTE, "nothing to execute"));
        };

        let resume_from = state
            .execution
            .as_ref()
            .filter(|r| r.status == Some(ExecutionStatus::Partial));
        let mut completed: Vec<CompletedStep> = resume_from
            .map(|r| r.completed_steps.clone())
            .unwrap_or_default();
        let mut object_id = resume_from
            .and_then(|r| r.completed_entity(StepKind::Object))
            .map(String::from);

        let steps = plan(operation, spec);
        let total = steps.len();
        let mut failure: Option<(String, PlatformError)> = None;

        for step in steps {
            if completed.iter().any(|c| c.index == step.index) {
                debug!(index = step.index, "step already completed, skipping");
                continue;
            }
            let mut request = step.request;
            if step.kind == StepKind::Field {
                // Field writes attach to the object created in step 0.
                if let (Some(id), Some(payload)) = (&object_id, request.payload.as_object_mut()) {
                    payload.insert("object_id".to_string(), json!(id));
                }
            }
            match self.platform.apply_change(request).await {
                Ok(outcome) => {
                    if step.kind == StepKind::Object {
                        object_id = Some(outcome.resource_id.clone());
                    }
                    completed.push(CompletedStep {
                        kind: step.kind,
                        index: step.index,
                        entity_id: outcome.resource_id,
                    });
                }
                Err(error) => {
                    warn!(index = step.index, %error, "step failed, stopping the plan");
                    failure = Some((format!("step {}: {error}", step.index), error));
                    break;
                }
            }
        }

        let patch = match failure {
            None => {
                debug!(total, "object plan fully applied");
                let mut result = ExecutionResult::success().with_completed_steps(completed);
                if let Some(id) = object_id {
                    result = result.with_object_id(id);
                }
                ObjectPatch {
                    current_node: Update::set(names::EXECUTE.to_string()),
                    execution: Update::set(Some(result)),
                    error: Update::Reset,
                    ..ObjectPatch::default()
                }
            }
            Some((message, error)) => {
                let workflow_failure = match &error {
                    PlatformError::Rejected(_) => WorkflowFailure::fatal(message.clone()),
                    PlatformError::Unreachable(_) => WorkflowFailure::transient(message.clone()),
                };
                let mut result = if completed.is_empty() {
                    ExecutionResult::failed(vec![message])
                } else {
                    ExecutionResult::partial(completed, vec![message])
                };
                if let Some(id) = object_id {
                    result = result.with_object_id(id);
                }
                ObjectPatch {
                    current_node: Update::set(names::EXECUTE.to_string()),
                    execution: Update::set(Some(result)),
                    error: Update::set(Some(workflow_failure)),
                    ..ObjectPatch::default()
                }
            }
        };
        Ok(patch)
    }
}

/// Success terminal handler. Idempotent.
pub struct SuccessNode;

#[async_trait]
impl Node<ObjectState> for SuccessNode {
    fn name(&self) -> &str {
        names::SUCCESS
    }

    async fn run(&self, state: &ObjectState) -> Result<ObjectPatch, NodeError> {
        if state.is_completed {
            return Ok(ObjectPatch {
                current_node: Update::set(names::SUCCESS.to_string()),
                ..ObjectPatch::default()
            });
        }
        Ok(ObjectPatch {
            current_node: Update::set(names::SUCCESS.to_string()),
            is_completed: Update::set(true),
            error: Update::Reset,
            ..ObjectPatch::default()
        })
    }
}

/// Error terminal handler. Guarantees an execution result with a recognized
/// status before returning to the coordinator. Idempotent.
pub struct ErrorNode;

#[async_trait]
impl Node<ObjectState> for ErrorNode {
    fn name(&self) -> &str {
        names::ERROR
    }

    async fn run(&self, state: &ObjectState) -> Result<ObjectPatch, NodeError> {
        if state.is_completed {
            return Ok(ObjectPatch {
                current_node: Update::set(names::ERROR.to_string()),
                ..ObjectPatch::default()
            });
        }
        let message = state
            .error
            .as_ref()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "object workflow failed".to_string());
        let execution = match &state.execution {
            Some(result) if result.status.is_some() => None,
            _ => Some(ExecutionResult::failed(vec![message])),
        };
        Ok(ObjectPatch {
            current_node: Update::set(names::ERROR.to_string()),
            is_completed: Update::set(true),
            execution: execution.map(|r| Update::set(Some(r))).unwrap_or_default(),
            ..ObjectPatch::default()
        })
    }
}

/// Retry handler: counts the attempt and clears the failure. The retry
/// router decides whether the retried run resumes at execute (partial
/// progress) or restarts at classify_operation.
pub struct RetryNode {
    policy: RetryPolicy,
}

impl RetryNode {
    /// Create the handler with the graph's retry policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Node<ObjectState> for RetryNode {
    fn name(&self) -> &str {
        names::RETRY
    }

    async fn run(&self, state: &ObjectState) -> Result<ObjectPatch, NodeError> {
        let attempt = state.retry_count + 1;
        if attempt > self.policy.max_attempts {
            return Ok(ObjectPatch {
                current_node: Update::set(names::RETRY.to_string()),
                retry_count: Update::set(attempt),
                error: Update::set(Some(WorkflowFailure::fatal(
                    "maximum retry attempts exceeded",
                ))),
                ..ObjectPatch::default()
            });
        }
        debug!(attempt, max = self.policy.max_attempts, "retrying");
        Ok(ObjectPatch {
            current_node: Update::set(names::RETRY.to_string()),
            retry_count: Update::set(attempt),
            error: Update::Reset,
            ..ObjectPatch::default()
        })
    }
}
