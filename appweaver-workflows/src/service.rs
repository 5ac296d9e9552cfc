//! The public run surface.
//!
//! [`WorkflowService::run`] is the one entry point callers see. It seeds a
//! per-request reset over the session's persisted state, invokes the
//! coordinator graph, and always returns a [`RunResponse`]; engine errors
//! become error payloads, never panics or propagated errors.

use crate::application::ApplicationBridge;
use crate::coordinator::{build_coordinator_graph, names, CoordinatorPatch, CoordinatorState};
use crate::coordinator::state::IntentErrorRecord;
use crate::dispatcher::DomainDispatcher;
use crate::object::ObjectBridge;
use appweaver_core::{
    generate_session_id, ExecutionResult, PlatformClient, StructuredExtractor,
};
use appweaver_graph::{
    Checkpointer, CompiledGraph, GraphResult, LogUpdate, RunConfig, Update,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// One incoming request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// The user's message.
    pub message: String,
    /// Session to continue; a new one is opened when absent.
    pub session_id: Option<String>,
}

impl RunRequest {
    /// A request opening a new session.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
        }
    }

    /// A request continuing an existing session.
    pub fn for_session(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: Some(session_id.into()),
        }
    }
}

/// Payload of a run that reached the success terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessPayload {
    /// Human-readable summary line.
    pub reply: String,
    /// Execution results collected across the batch.
    pub execution_results: Vec<ExecutionResult>,
    /// Per-intent errors; a successful run may still carry some.
    pub intent_errors: Vec<IntentErrorRecord>,
    /// Applications created across the session so far.
    pub applications_created: u32,
    /// Objects created across the session so far.
    pub objects_created: u32,
    /// Nodes visited during the run, in order.
    pub visited: Vec<String>,
}

/// Payload of a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// What went wrong.
    pub message: String,
    /// The node the run ended on, when it got that far.
    pub failed_node: Option<String>,
    /// Retries consumed before the failure.
    pub retry_count: u32,
    /// Per-intent errors recorded before the failure.
    pub intent_errors: Vec<IntentErrorRecord>,
}

/// Outcome payload, by terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunData {
    /// The run reached its success terminal.
    Success(SuccessPayload),
    /// The run failed.
    Error(ErrorPayload),
}

/// The response every [`WorkflowService::run`] call returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// True if the run reached the success terminal.
    pub success: bool,
    /// Human-readable summary of the outcome.
    pub message: String,
    /// The session the run belongs to, for follow-up requests.
    pub session_id: String,
    /// Terminal-specific payload.
    pub data: RunData,
}

/// The assembled workflow stack behind one pair of collaborators.
pub struct WorkflowService {
    graph: CompiledGraph<CoordinatorState>,
}

impl WorkflowService {
    /// Assemble the coordinator over the application and object workflows.
    pub fn new(
        extractor: Arc<dyn StructuredExtractor>,
        platform: Arc<dyn PlatformClient>,
        checkpointer: Option<Arc<dyn Checkpointer<CoordinatorState>>>,
    ) -> GraphResult<Self> {
        let dispatcher = DomainDispatcher::new()
            .register(ApplicationBridge::new(
                Arc::clone(&extractor),
                Arc::clone(&platform),
            )?)
            .register(ObjectBridge::new(Arc::clone(&extractor), platform)?);
        Ok(Self {
            graph: build_coordinator_graph(extractor, dispatcher, checkpointer)?,
        })
    }

    /// Number of nodes in the assembled coordinator graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Handle one request. Always returns a response.
    pub async fn run(&self, request: RunRequest) -> RunResponse {
        let session_id = request.session_id.unwrap_or_else(generate_session_id);

        if request.message.trim().is_empty() {
            return RunResponse {
                success: false,
                message: "message must not be empty".to_string(),
                session_id,
                data: RunData::Error(ErrorPayload {
                    message: "message must not be empty".to_string(),
                    failed_node: None,
                    retry_count: 0,
                    intent_errors: Vec::new(),
                }),
            };
        }

        let seed = Self::request_seed(&request.message, &session_id);
        let config = RunConfig::for_thread(session_id.clone());

        match self.graph.invoke(seed, config).await {
            Ok(report) => {
                let state = report.state;
                let succeeded = state.current_node == names::SUCCESS;
                info!(
                    session_id = %session_id,
                    steps = report.steps,
                    succeeded,
                    "request handled"
                );
                if succeeded {
                    let reply = Self::reply_line(&state);
                    RunResponse {
                        success: true,
                        message: reply.clone(),
                        session_id,
                        data: RunData::Success(SuccessPayload {
                            reply,
                            execution_results: state.execution_results,
                            intent_errors: state.intent_errors,
                            applications_created: state.applications_created,
                            objects_created: state.objects_created,
                            visited: report.visited,
                        }),
                    }
                } else {
                    let message = state
                        .error
                        .map(|failure| failure.message)
                        .unwrap_or_else(|| "request failed".to_string());
                    RunResponse {
                        success: false,
                        message: message.clone(),
                        session_id,
                        data: RunData::Error(ErrorPayload {
                            message,
                            failed_node: Some(state.current_node),
                            retry_count: state.retry_count,
                            intent_errors: state.intent_errors,
                        }),
                    }
                }
            }
            Err(graph_error) => {
                error!(session_id = %session_id, %graph_error, "run aborted");
                RunResponse {
                    success: false,
                    message: graph_error.to_string(),
                    session_id,
                    data: RunData::Error(ErrorPayload {
                        message: graph_error.to_string(),
                        failed_node: None,
                        retry_count: 0,
                        intent_errors: Vec::new(),
                    }),
                }
            }
        }
    }

    /// Seed for one request over the session's persisted state: set the
    /// request text, reset every per-request field, keep the session-scoped
    /// accumulators (transcript, created counters).
    fn request_seed(message: &str, session_id: &str) -> CoordinatorPatch {
        CoordinatorPatch {
            user_message: Update::set(message.to_string()),
            session_id: Update::set(session_id.to_string()),
            current_node: Update::Reset,
            intents: Update::Reset,
            dependencies: Update::Reset,
            current_intent_index: Update::Reset,
            processed_intents: LogUpdate::Reset,
            decision: Update::Reset,
            intent_errors: LogUpdate::Reset,
            execution_results: LogUpdate::Reset,
            retry_count: Update::Reset,
            error: Update::Reset,
            is_completed: Update::Reset,
            transcript: LogUpdate::push(format!("user: {message}")),
            ..CoordinatorPatch::default()
        }
    }

    fn reply_line(state: &CoordinatorState) -> String {
        state
            .transcript
            .iter()
            .rev()
            .find_map(|line| line.strip_prefix("assistant: "))
            .unwrap_or("request processed")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appweaver_core::testing::{ScriptedExtractor, ScriptedPlatform};
    use appweaver_core::{ChangeOutcome, ExtractionError, ToolInvocation};
    use appweaver_graph::InMemoryCheckpointer;
    use serde_json::json;

    fn app_intent_invocation() -> ToolInvocation {
        ToolInvocation::new(
            "classify_intents",
            json!({
                "intents": [
                    {"domain": "application", "action": "create", "targets": ["crm"], "details": "a sales crm"}
                ]
            }),
        )
    }

    fn app_operation_invocation() -> ToolInvocation {
        ToolInvocation::new(
            "classify_application_operation",
            json!({"action": "create", "target": "crm"}),
        )
    }

    fn app_design_invocation() -> ToolInvocation {
        ToolInvocation::new(
            "design_application",
            json!({"name": "crm", "description": "a sales crm"}),
        )
    }

    fn service(extractor: ScriptedExtractor, platform: ScriptedPlatform) -> WorkflowService {
        WorkflowService::new(
            Arc::new(extractor),
            Arc::new(platform),
            Some(Arc::new(InMemoryCheckpointer::new())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_run_returns_success_payload() {
        let extractor = ScriptedExtractor::new()
            .with_invocation(app_intent_invocation())
            .with_invocation(app_operation_invocation())
            .with_invocation(app_design_invocation());
        let platform =
            ScriptedPlatform::new().with_outcome(ChangeOutcome::new("app_1", json!({})));
        let service = service(extractor, platform);

        let response = service.run(RunRequest::new("build a crm")).await;

        assert!(response.success);
        assert!(response.session_id.starts_with("session_"));
        let message = response.message.clone();
        let RunData::Success(payload) = response.data else {
            panic!("expected success payload");
        };
        assert_eq!(message, payload.reply);
        assert_eq!(payload.execution_results.len(), 1);
        assert_eq!(payload.applications_created, 1);
        assert!(payload.intent_errors.is_empty());
        assert_eq!(payload.visited.last().map(String::as_str), Some("success"));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_running() {
        let extractor = ScriptedExtractor::new();
        let service = service(extractor.clone(), ScriptedPlatform::new());

        let response = service.run(RunRequest::new("   ")).await;

        assert!(!response.success);
        assert_eq!(extractor.call_count(), 0);
        let RunData::Error(payload) = response.data else {
            panic!("expected error payload");
        };
        assert!(payload.message.contains("must not be empty"));
    }

    #[tokio::test]
    async fn test_failed_classification_returns_error_payload() {
        let extractor = ScriptedExtractor::new()
            .with_failure(ExtractionError::Provider("timeout".into()))
            .with_failure(ExtractionError::Provider("timeout".into()));
        let service = service(extractor, ScriptedPlatform::new());

        let response = service.run(RunRequest::new("build a crm")).await;

        assert!(!response.success);
        let message = response.message.clone();
        let RunData::Error(payload) = response.data else {
            panic!("expected error payload");
        };
        assert_eq!(message, payload.message);
        assert_eq!(payload.intent_errors.len(), 1);
        assert_eq!(payload.failed_node.as_deref(), Some("error"));
        assert_eq!(payload.retry_count, 1);
    }

    #[tokio::test]
    async fn test_session_accumulates_across_requests() {
        let extractor = ScriptedExtractor::new()
            // First request.
            .with_invocation(app_intent_invocation())
            .with_invocation(app_operation_invocation())
            .with_invocation(app_design_invocation())
            // Second request.
            .with_invocation(app_intent_invocation())
            .with_invocation(app_operation_invocation())
            .with_invocation(app_design_invocation());
        let platform = ScriptedPlatform::new()
            .with_outcome(ChangeOutcome::new("app_1", json!({})))
            .with_outcome(ChangeOutcome::new("app_2", json!({})));
        let service = service(extractor, platform);

        let first = service.run(RunRequest::new("build a crm")).await;
        let second = service
            .run(RunRequest::for_session(
                "build another crm",
                first.session_id.clone(),
            ))
            .await;

        assert_eq!(second.session_id, first.session_id);
        let RunData::Success(payload) = second.data else {
            panic!("expected success payload");
        };
        // Session counter survived the per-request reset; per-request
        // results did not.
        assert_eq!(payload.applications_created, 2);
        assert_eq!(payload.execution_results.len(), 1);
    }

    #[tokio::test]
    async fn test_response_serializes() {
        let response = RunResponse {
            success: true,
            message: "done".to_string(),
            session_id: "session_x".to_string(),
            data: RunData::Success(SuccessPayload {
                reply: "done".to_string(),
                execution_results: vec![],
                intent_errors: vec![],
                applications_created: 1,
                objects_created: 0,
                visited: vec![],
            }),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"kind\":\"success\""));
    }
}
