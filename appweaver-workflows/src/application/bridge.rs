//! Coordinator↔application bridge.

use crate::application::graph::build_application_graph;
use crate::application::state::{ApplicationPatch, ApplicationState};
use crate::coordinator::state::{CoordinatorPatch, CoordinatorState};
use crate::subgraph::DomainBridge;
use appweaver_core::{
    ChangeAction, Domain, ExecutionStatus, Intent, IntentKind, PlatformClient,
    StructuredExtractor,
};
use appweaver_graph::{CompiledGraph, GraphResult, LogUpdate, Update};
use std::sync::Arc;

fn restate(intent: &Intent) -> String {
    let verb = match intent.kind {
        IntentKind::CreateApplication => "create",
        IntentKind::UpdateApplication => "update",
        IntentKind::DeleteApplication => "delete",
        _ => "handle",
    };
    format!(
        "{verb} application '{}': {}",
        intent.targets.join(", "),
        intent.details
    )
}

/// Bridge exposing the application workflow to the coordinator.
pub struct ApplicationBridge {
    graph: CompiledGraph<ApplicationState>,
}

impl ApplicationBridge {
    /// Build the bridge and its inner graph over the shared collaborators.
    pub fn new(
        extractor: Arc<dyn StructuredExtractor>,
        platform: Arc<dyn PlatformClient>,
    ) -> GraphResult<Self> {
        Ok(Self {
            graph: build_application_graph(extractor, platform)?,
        })
    }
}

impl DomainBridge for ApplicationBridge {
    type Inner = ApplicationState;

    fn domain(&self) -> Domain {
        Domain::Application
    }

    fn validate_context(&self, state: &CoordinatorState) -> Result<(), String> {
        let Some(intent) = state.current_intent() else {
            return Err("no current intent to dispatch".to_string());
        };
        if intent.domain != Domain::Application {
            return Err(format!(
                "intent targets domain '{}', not 'application'",
                intent.domain
            ));
        }
        if state.user_message.trim().is_empty() {
            return Err("request text is empty".to_string());
        }
        Ok(())
    }

    fn subgraph_seed(&self, state: &CoordinatorState) -> ApplicationPatch {
        // validate_context ran first, so a current intent exists.
        let request = state.current_intent().map(restate).unwrap_or_default();
        ApplicationPatch {
            request: Update::set(request),
            session_id: Update::set(state.session_id.clone()),
            ..ApplicationPatch::reset_all()
        }
    }

    fn graph(&self) -> &CompiledGraph<ApplicationState> {
        &self.graph
    }

    fn validate_results(&self, inner: &ApplicationState) -> Result<(), String> {
        let Some(result) = &inner.execution else {
            return Err("application run produced no execution result".to_string());
        };
        match result.status {
            None => Err("execution result carries no status".to_string()),
            Some(ExecutionStatus::Success) if result.application_id.is_none() => {
                Err("successful run is missing its application id".to_string())
            }
            Some(_) => Ok(()),
        }
    }

    fn coordinator_patch(
        &self,
        state: &CoordinatorState,
        inner: &ApplicationState,
    ) -> CoordinatorPatch {
        let index = state.current_intent_index;
        let result = inner
            .execution
            .clone()
            .unwrap_or_default();

        let mut patch = CoordinatorPatch {
            current_node: Update::set(Domain::Application.label().to_string()),
            execution_results: LogUpdate::push(result.clone()),
            processed_intents: LogUpdate::push(index),
            current_intent_index: Update::set(index + 1),
            ..CoordinatorPatch::default()
        };

        match result.status {
            Some(ExecutionStatus::Success) => {
                let created = matches!(
                    inner.operation.as_ref().map(|op| op.action),
                    Some(ChangeAction::Create)
                );
                if created {
                    patch.applications_created = Update::set(state.applications_created + 1);
                }
                patch.transcript = LogUpdate::push(format!(
                    "assistant: application intent {index} applied ({})",
                    result.application_id.as_deref().unwrap_or("unknown id")
                ));
            }
            _ => {
                // The run failed inside its own workflow; record it and move
                // on without poisoning the rest of the batch.
                let message = result
                    .errors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "application workflow failed".to_string());
                let id = state
                    .current_intent()
                    .map(|i| i.id.clone())
                    .unwrap_or_default();
                patch.intent_errors =
                    LogUpdate::push(crate::coordinator::state::IntentErrorRecord { id, message });
            }
        }
        patch
    }
}
