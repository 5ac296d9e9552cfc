//! Object workflow wiring.
//!
//! Same pipeline shape as the application workflow, with one difference in
//! the retry router: partial execution progress resumes at execute instead
//! of restarting the whole pipeline, so completed platform writes are never
//! repeated.

use crate::object::nodes::{
    names, ClassifyOperationNode, DesignNode, ErrorNode, ExecuteNode, RetryNode, SuccessNode,
    ValidateNode,
};
use crate::object::state::ObjectState;
use crate::routing::{failure_route, labels, missing_artifact_route, RetryPolicy};
use appweaver_core::{ExecutionStatus, PlatformClient, StructuredExtractor};
use appweaver_graph::{CompiledGraph, GraphBuilder, GraphResult, Router, END};
use std::sync::Arc;

/// Domain workflows get three attempts before giving up.
pub const RETRY_POLICY: RetryPolicy = RetryPolicy::new(3);

fn stage_router(
    name: &str,
    happy: &'static str,
    ready: impl Fn(&ObjectState) -> bool + Send + Sync + 'static,
) -> Router<ObjectState> {
    Router::new(
        name,
        &[happy, labels::RETRY, labels::ERROR],
        move |state: &ObjectState| match &state.error {
            Some(failure) => failure_route(failure, state.retry_count, RETRY_POLICY),
            None if ready(state) => happy,
            None => missing_artifact_route(state.retry_count, RETRY_POLICY),
        },
    )
}

/// Build the object workflow graph.
pub fn build_object_graph(
    extractor: Arc<dyn StructuredExtractor>,
    platform: Arc<dyn PlatformClient>,
) -> GraphResult<CompiledGraph<ObjectState>> {
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
        &[names::CLASSIFY_OPERATION, names::EXECUTE, labels::ERROR],
        |state: &ObjectState| {
            if state.error.is_some() {
                labels::ERROR
            } else if matches!(
                state.execution.as_ref().and_then(|r| r.status),
                Some(ExecutionStatus::Partial)
            ) {
                // Partial progress resumes the plan rather than re-deriving it.
                names::EXECUTE
            } else {
                names::CLASSIFY_OPERATION
            }
        },
    );

    GraphBuilder::<ObjectState>::new("object")
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
                (names::EXECUTE, names::EXECUTE),
                (labels::ERROR, names::ERROR),
            ],
        )
        .edge(names::SUCCESS, END)
        .edge(names::ERROR, END)
        .max_steps(60)
        .build()
}
