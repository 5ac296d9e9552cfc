//! Application workflow nodes.

use crate::application::state::{
    ApplicationOperation, ApplicationPatch, ApplicationSpec, ApplicationState,
};
use crate::prompts;
use crate::routing::RetryPolicy;
use appweaver_core::{
    ChangeAction, ChangeRequest, ChatMessage, CompletedStep, ExecutionResult, PlatformClient,
    PlatformError, ResourceKind, StepKind, StructuredExtractor, WorkflowFailure,
};
use appweaver_graph::{Node, NodeError, Update};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Node names used when wiring the application graph.
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

fn transient(node: &str, message: impl Into<String>) -> ApplicationPatch {
    ApplicationPatch {
        current_node: Update::set(node.to_string()),
        error: Update::set(Some(WorkflowFailure::transient(message))),
        ..ApplicationPatch::default()
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
impl Node<ApplicationState> for ClassifyOperationNode {
    fn name(&self) -> &str {
        names::CLASSIFY_OPERATION
    }

    async fn run(&self, state: &ApplicationState) -> Result<ApplicationPatch, NodeError> {
        let messages = [ChatMessage::user(state.request.as_str())];
        let tools = [prompts::classify_application_tool()];

        let invocation = match self
            .extractor
            .extract(prompts::CLASSIFY_APPLICATION_PROMPT, &messages, &tools)
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
                format!("unknown application action '{}'", args.action),
            ));
        };

        debug!(?action, target = %args.target, "classified application operation");
        Ok(ApplicationPatch {
            current_node: Update::set(names::CLASSIFY_OPERATION.to_string()),
            operation: Update::set(Some(ApplicationOperation {
                action,
                target: args.target,
            })),
            error: Update::Reset,
            ..ApplicationPatch::default()
        })
    }
}

#[derive(Debug, Deserialize)]
struct SpecArgs {
    name: String,
    #[serde(default)]
    description: String,
}

/// Produces the application specification via the extraction collaborator.
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
impl Node<ApplicationState> for DesignNode {
    fn name(&self) -> &str {
        names::DESIGN
    }

    async fn run(&self, state: &ApplicationState) -> Result<ApplicationPatch, NodeError> {
        let messages = [ChatMessage::user(state.request.as_str())];
        let tools = [prompts::design_application_tool()];

        let invocation = match self
            .extractor
            .extract(prompts::DESIGN_APPLICATION_PROMPT, &messages, &tools)
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
        let args: SpecArgs = match serde_json::from_value(invocation.args) {
            Ok(args) => args,
            Err(error) => {
                return Ok(transient(
                    names::DESIGN,
                    format!("design arguments malformed: {error}"),
                ));
            }
        };

        Ok(ApplicationPatch {
            current_node: Update::set(names::DESIGN.to_string()),
            spec: Update::set(Some(ApplicationSpec {
                name: args.name,
                description: args.description,
            })),
            error: Update::Reset,
            ..ApplicationPatch::default()
        })
    }
}

/// Checks the designed spec. Validation problems are structural, so they
/// are recorded as fatal and never retried.
pub struct ValidateNode;

#[async_trait]
impl Node<ApplicationState> for ValidateNode {
    fn name(&self) -> &str {
        names::VALIDATE
    }

    async fn run(&self, state: &ApplicationState) -> Result<ApplicationPatch, NodeError> {
        let Some(spec) = &state.spec else {
            return Ok(ApplicationPatch {
                current_node: Update::set(names::VALIDATE.to_string()),
                error: Update::set(Some(WorkflowFailure::fatal(
                    "no specification to validate",
                ))),
                ..ApplicationPatch::default()
            });
        };
        if spec.name.trim().is_empty() {
            return Ok(ApplicationPatch {
                current_node: Update::set(names::VALIDATE.to_string()),
                error: Update::set(Some(WorkflowFailure::fatal(
                    "application name must not be empty",
                ))),
                ..ApplicationPatch::default()
            });
        }
        Ok(ApplicationPatch {
            current_node: Update::set(names::VALIDATE.to_string()),
            validated: Update::set(true),
            error: Update::Reset,
            ..ApplicationPatch::default()
        })
    }
}

/// Applies the change against the platform. The single side-effecting node
/// of this workflow; it runs its write at most once per invocation.
pub struct ExecuteNode {
    platform: Arc<dyn PlatformClient>,
}

impl ExecuteNode {
    /// Create the node over a platform client.
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Node<ApplicationState> for ExecuteNode {
    fn name(&self) -> &str {
        names::EXECUTE
    }

    async fn run(&self, state: &ApplicationState) -> Result<ApplicationPatch, NodeError> {
        let (Some(operation), Some(spec)) = (&state.operation, &state.spec) else {
            return Ok(transient(names::EXECUTE, "nothing to execute"));
        };

        let request = ChangeRequest::new(
            ResourceKind::Application,
            operation.action,
            json!({
                "name": spec.name,
                "description": spec.description,
                "target": operation.target,
            }),
        );

        match self.platform.apply_change(request).await {
            Ok(outcome) => {
                debug!(resource_id = %outcome.resource_id, "application change applied");
                let result = ExecutionResult::success()
                    .with_application_id(outcome.resource_id.clone())
                    .with_completed_steps(vec![CompletedStep {
                        kind: StepKind::Application,
                        index: 0,
                        entity_id: outcome.resource_id,
                    }]);
                Ok(ApplicationPatch {
                    current_node: Update::set(names::EXECUTE.to_string()),
                    execution: Update::set(Some(result)),
                    error: Update::Reset,
                    ..ApplicationPatch::default()
                })
            }
            Err(error) => {
                warn!(%error, "application change failed");
                let failure = match &error {
                    PlatformError::Rejected(_) => WorkflowFailure::fatal(error.to_string()),
                    PlatformError::Unreachable(_) => {
                        WorkflowFailure::transient(error.to_string())
                    }
                };
                Ok(ApplicationPatch {
                    current_node: Update::set(names::EXECUTE.to_string()),
                    execution: Update::set(Some(ExecutionResult::failed(vec![
                        error.to_string()
                    ]))),
                    error: Update::set(Some(failure)),
                    ..ApplicationPatch::default()
                })
            }
        }
    }
}

/// Success terminal handler. Idempotent.
pub struct SuccessNode;

#[async_trait]
impl Node<ApplicationState> for SuccessNode {
    fn name(&self) -> &str {
        names::SUCCESS
    }

    async fn run(&self, state: &ApplicationState) -> Result<ApplicationPatch, NodeError> {
        if state.is_completed {
            return Ok(ApplicationPatch {
                current_node: Update::set(names::SUCCESS.to_string()),
                ..ApplicationPatch::default()
            });
        }
        Ok(ApplicationPatch {
            current_node: Update::set(names::SUCCESS.to_string()),
            is_completed: Update::set(true),
            error: Update::Reset,
            ..ApplicationPatch::default()
        })
    }
}

/// Error terminal handler. Guarantees an execution result with a recognized
/// status is present before the run returns to the coordinator. Idempotent.
pub struct ErrorNode;

#[async_trait]
impl Node<ApplicationState> for ErrorNode {
    fn name(&self) -> &str {
        names::ERROR
    }

    async fn run(&self, state: &ApplicationState) -> Result<ApplicationPatch, NodeError> {
        if state.is_completed {
            return Ok(ApplicationPatch {
                current_node: Update::set(names::ERROR.to_string()),
                ..ApplicationPatch::default()
            });
        }
        let message = state
            .error
            .as_ref()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "application workflow failed".to_string());
        let execution = match &state.execution {
            Some(result) if result.status.is_some() => None,
            _ => Some(ExecutionResult::failed(vec![message])),
        };
        Ok(ApplicationPatch {
            current_node: Update::set(names::ERROR.to_string()),
            is_completed: Update::set(true),
            execution: execution.map(|r| Update::set(Some(r))).unwrap_or_default(),
            ..ApplicationPatch::default()
        })
    }
}

/// Retry handler: counts the attempt and clears the failure.
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
impl Node<ApplicationState> for RetryNode {
    fn name(&self) -> &str {
        names::RETRY
    }

    async fn run(&self, state: &ApplicationState) -> Result<ApplicationPatch, NodeError> {
        let attempt = state.retry_count + 1;
        if attempt > self.policy.max_attempts {
            return Ok(ApplicationPatch {
                current_node: Update::set(names::RETRY.to_string()),
                retry_count: Update::set(attempt),
                error: Update::set(Some(WorkflowFailure::fatal(
                    "maximum retry attempts exceeded",
                ))),
                ..ApplicationPatch::default()
            });
        }
        debug!(attempt, max = self.policy.max_attempts, "retrying");
        Ok(ApplicationPatch {
            current_node: Update::set(names::RETRY.to_string()),
            retry_count: Update::set(attempt),
            error: Update::Reset,
            ..ApplicationPatch::default()
        })
    }
}
