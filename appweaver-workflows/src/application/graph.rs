//! Application workflow wiring.
//!
//! classify_operation → design → validate → execute, with retry feeding
//! back into classify_operation and both terminals edging to END.

use crate::application::nodes::{
    names, ClassifyOperationNode, DesignNode, ErrorNode, ExecuteNode, RetryNode, SuccessNode,
    ValidateNode,
};
use crate::application::state::ApplicationState;
use crate::routing::{failure_route, labels, missing_artifact_route, RetryPolicy};
use appweaver_core::{ExecutionStatus, PlatformClient, StructuredExtractor};
use appweaver_graph::{CompiledGraph, GraphBuilder, GraphResult, Router, END};
use std::sync::Arc;

/// Domain workflows get three attempts before giving up.
pub const RETRY_POLICY: RetryPolicy = RetryPolicy::new(3);

fn stage_router(
    name: &str,
    happy: &'static str,
    ready: impl Fn(&ApplicationState) -> bool + Send + Sync + 'static,
) -> Router<ApplicationState> {
    Router::new(
        name.to_string(),
        &[happy, labels::RETRY, labels::ERROR],
        move |state: &ApplicationState| match &state.error {
            Some(failure) => failure_route(failure, state.retry_count, RETRY_POLICY),
            None if ready(state) => happy,
            None => missing_artifact_route(state.retry_count, RETRY_POLICY),
        },
    )
}

/// Build the application workflow graph.
pub fn build_application_graph(
    extractor: Arc<dyn StructuredExtractor>,
    platform: Arc<dyn PlatformClient>,
) -> GraphResult<CompiledGraph<ApplicationState>> {
    let after_classify = stage_router("after_classify_operation", names::DESIGN, |state| {
        state.operation.is_some()
    });
    let after_design =
        stage_router("after_design", names::VALIDATE, |state| state.spec.is_some());
    let after_validate =
        stage_router("after_validate", names::EXECUTE, |state| state.validated);
    let after_execute = stage_router("after_execute", labels::SUCCESS, |state| {
        matches!(
            state.execution.as_ref().and_then(|r| r.status),
            Some(ExecutionStatus::Success)
        )
    });
    let after_retry = Router::new(
        "after_retry",
        &[names::CLASSIFY_OPERATION, labels::ERROR],
        |state: &ApplicationState| {
            if state.error.is_some() {
                labels::ERROR
            } else {
                names::CLASSIFY_OPERATION
            }
        },
    );

    GraphBuilder::<ApplicationState>::new("application")
        .node(
            names::CLASSIFY_OPERATION,
            ClassifyOperationNode::new(Arc::clone(&extractor)),
        )
        .node(names::DESIGN, DesignNode::new(extractor))
        .node(names::VALIDATE, ValidateNode)
        .node(names::EXECUTE, ExecuteNode::new(platform))
        .node(names::SUCCESS, SuccessNode)
        .node(names::ERROR, ErrorNode)
        .node(names::RETRY, RetryNode::new(RETRY_POLICY))
        .entry(names::CLASSIFY_OPERATION)
        .conditional(
            names::CLASSIFY_OPERATION,
            after_classify,
            &[
                (names::DESIGN, names::DESIGN),
                (labels::RETRY, names::RETRY),
                (labels::ERROR, names::ERROR),
            ],
        )
        .conditional(
            names::DESIGN,
            after_design,
            &[
                (names::VALIDATE, names::VALIDATE),
                (labels::RETRY, names::RETRY),
                (labels::ERROR, names::ERROR),
            ],
        )
        .conditional(
            names::VALIDATE,
            after_validate,
            &[
                (names::EXECUTE, names::EXECUTE),
                (labels::RETRY, names::RETRY),
                (labels::ERROR, names::ERROR),
            ],
        )
        .conditional(
            names::EXECUTE,
            after_execute,
            &[
                (labels::SUCCESS, names::SUCCESS),
                (labels::RETRY, names::RETRY),
                (labels::ERROR, names::ERROR),
            ],
        )
        .conditional(
            names::RETRY,
            after_retry,
            &[
                (names::CLASSIFY_OPERATION, names::CLASSIFY_OPERATION),
                (labels::ERROR, names::ERROR),
            ],
        )
        .edge(names::SUCCESS, END)
        .edge(names::ERROR, END)
        .max_steps(60)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::state::ApplicationPatch;
    use appweaver_core::testing::{ScriptedExtractor, ScriptedPlatform};
    use appweaver_core::{ChangeOutcome, ExtractionError, PlatformError, ToolInvocation};
    use appweaver_graph::{RunConfig, Update};
    use serde_json::json;

    fn operation_invocation() -> ToolInvocation {
        ToolInvocation::new(
            "classify_application_operation",
            json!({"action": "create", "target": "crm"}),
        )
    }

    fn design_invocation(name: &str) -> ToolInvocation {
        ToolInvocation::new(
            "design_application",
            json!({"name": name, "description": "a sales crm"}),
        )
    }

    fn seed() -> ApplicationPatch {
        ApplicationPatch {
            request: Update::set("create application 'crm': a sales crm".to_string()),
            ..ApplicationPatch::default()
        }
    }

    #[tokio::test]
    async fn test_full_run_succeeds() {
        let extractor = Arc::new(
            ScriptedExtractor::new()
                .with_invocation(operation_invocation())
                .with_invocation(design_invocation("crm")),
        );
        let platform =
            Arc::new(ScriptedPlatform::new().with_outcome(ChangeOutcome::new("app_1", json!({}))));
        let graph = build_application_graph(extractor, platform.clone()).unwrap();

        let report = graph.invoke(seed(), RunConfig::default()).await.unwrap();
        let state = report.state;

        assert!(state.is_completed);
        assert!(state.error.is_none());
        let result = state.execution.unwrap();
        assert_eq!(result.application_id.as_deref(), Some("app_1"));
        assert_eq!(platform.call_count(), 1);
        assert_eq!(
            report.visited,
            vec!["classify_operation", "design", "validate", "execute", "success"]
        );
    }

    #[tokio::test]
    async fn test_transient_design_failure_retries_from_the_top() {
        let extractor = Arc::new(
            ScriptedExtractor::new()
                .with_invocation(operation_invocation())
                .with_failure(ExtractionError::NoStructuredResponse)
                .with_invocation(operation_invocation())
                .with_invocation(design_invocation("crm")),
        );
        let platform =
            Arc::new(ScriptedPlatform::new().with_outcome(ChangeOutcome::new("app_1", json!({}))));
        let graph = build_application_graph(extractor.clone(), platform).unwrap();

        let report = graph.invoke(seed(), RunConfig::default()).await.unwrap();

        assert!(report.state.is_completed);
        assert!(report.state.error.is_none());
        assert_eq!(report.state.retry_count, 1);
        // Retry restarts at classify_operation, not mid-pipeline.
        assert_eq!(extractor.call_count(), 4);
    }

    #[tokio::test]
    async fn test_fatal_validation_reaches_error_without_retry() {
        let extractor = Arc::new(
            ScriptedExtractor::new()
                .with_invocation(operation_invocation())
                .with_invocation(design_invocation("   ")),
        );
        let platform = Arc::new(ScriptedPlatform::new());
        let graph = build_application_graph(extractor, platform.clone()).unwrap();

        let report = graph.invoke(seed(), RunConfig::default()).await.unwrap();
        let state = report.state;

        assert!(state.is_completed);
        assert_eq!(state.retry_count, 0);
        assert_eq!(platform.call_count(), 0);
        let result = state.execution.unwrap();
        assert!(result.errors[0].contains("name must not be empty"));
    }

    #[tokio::test]
    async fn test_retries_exhaust_at_the_ceiling() {
        // Every extraction attempt fails; three retries then the error edge.
        let mut extractor = ScriptedExtractor::new();
        for _ in 0..4 {
            extractor = extractor.with_failure(ExtractionError::Provider("timeout".into()));
        }
        let graph =
            build_application_graph(Arc::new(extractor), Arc::new(ScriptedPlatform::new()))
                .unwrap();

        let report = graph.invoke(seed(), RunConfig::default()).await.unwrap();
        let state = report.state;

        assert!(state.is_completed);
        assert_eq!(state.retry_count, RETRY_POLICY.max_attempts);
        assert!(state.execution.unwrap().status.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_platform_retries_then_errors() {
        let mut extractor = ScriptedExtractor::new();
        let mut platform = ScriptedPlatform::new();
        for _ in 0..4 {
            extractor = extractor
                .with_invocation(operation_invocation())
                .with_invocation(design_invocation("crm"));
            platform =
                platform.with_failure(PlatformError::Unreachable("connection refused".into()));
        }
        let platform = Arc::new(platform);
        let graph = build_application_graph(Arc::new(extractor), platform.clone()).unwrap();

        let report = graph.invoke(seed(), RunConfig::default()).await.unwrap();
        let state = report.state;

        assert!(state.is_completed);
        assert_eq!(state.retry_count, 3);
        assert_eq!(platform.call_count(), 4);
        assert!(state.execution.unwrap().errors[0].contains("unreachable"));
    }
}
