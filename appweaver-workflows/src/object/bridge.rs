//! Coordinator↔object bridge.

use crate::coordinator::state::{CoordinatorPatch, CoordinatorState, IntentErrorRecord};
use crate::object::graph::build_object_graph;
use crate::object::state::{ObjectPatch, ObjectState};
use crate::subgraph::DomainBridge;
use appweaver_core::{
    ChangeAction, Domain, ExecutionStatus, Intent, IntentKind, PlatformClient,
    StructuredExtractor,
};
use appweaver_graph::{CompiledGraph, GraphResult, LogUpdate, Update};
use std::sync::Arc;

fn restate(intent: &Intent) -> String {
    let verb = match intent.kind {
        IntentKind::CreateObject => "create",
        IntentKind::UpdateObject => "update",
        IntentKind::DeleteObject => "delete",
        _ => "handle",
    };
    format!(
        "{verb} object '{}': {}",
        intent.targets.join(", "),
        intent.details
    )
}

/// Bridge exposing the object workflow to the coordinator.
pub struct ObjectBridge {
    graph: CompiledGraph<ObjectState>,
}

impl ObjectBridge {
    /// Build the bridge and its inner graph over the shared collaborators.
    pub fn new(
        extractor: Arc<dyn StructuredExtractor>,
        platform: Arc<dyn PlatformClient>,
    ) -> GraphResult<Self> {
        Ok(Self {
            graph: build_object_graph(extractor, platform)?,
        })
    }
}

impl DomainBridge for ObjectBridge {
    type Inner = ObjectState;

    fn domain(&self) -> Domain {
        Domain::Object
    }

    fn validate_context(&self, state: &CoordinatorState) -> Result<(), String> {
        let Some(intent) = state.current_intent() else {
            return Err("no current intent to dispatch".to_string());
        };
        if intent.domain != Domain::Object {
            return Err(format!(
                "intent targets domain '{}', not 'object'",
                intent.domain
            ));
        }
        if state.user_message.trim().is_empty() {
            return Err("request text is empty".to_string());
        }
        Ok(())
    }

    fn subgraph_seed(&self, state: &CoordinatorState) -> ObjectPatch {
        let request = state.current_intent().map(restate).unwrap_or_default();
        ObjectPatch {
            request: Update::set(request),
            session_id: Update::set(state.session_id.clone()),
            ..ObjectPatch::reset_all()
        }
    }

    fn graph(&self) -> &CompiledGraph<ObjectState> {
        &self.graph
    }

    fn validate_results(&self, inner: &ObjectState) -> Result<(), String> {
        let Some(result) = &inner.execution else {
            return Err("object run produced no execution result".to_string());
        };
        match result.status {
            None => Err("execution result carries no status".to_string()),
            Some(ExecutionStatus::Success) | Some(ExecutionStatus::Partial)
                if result.object_id.is_none() =>
            {
                Err("run with completed steps is missing its object id".to_string())
            }
            Some(_) => Ok(()),
        }
    }

    fn coordinator_patch(
        &self,
        state: &CoordinatorState,
        inner: &ObjectState,
    ) -> CoordinatorPatch {
        let index = state.current_intent_index;
        let result = inner.execution.clone().unwrap_or_default();

        let mut patch = CoordinatorPatch {
            current_node: Update::set(Domain::Object.label().to_string()),
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
                    patch.objects_created = Update::set(state.objects_created + 1);
                }
                patch.transcript = LogUpdate::push(format!(
                    "assistant: object intent {index} applied ({})",
                    result.object_id.as_deref().unwrap_or("unknown id")
                ));
            }
            _ => {
                let message = result
                    .errors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "object workflow failed".to_string());
                let id = state
                    .current_intent()
                    .map(|i| i.id.clone())
                    .unwrap_or_default();
                patch.intent_errors = LogUpdate::push(IntentErrorRecord { id, message });
            }
        }
        patch
    }
}
