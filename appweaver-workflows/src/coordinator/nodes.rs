//! Coordinator nodes: classification, sequencing, and terminal handlers.

use crate::coordinator::state::{
    CoordinatorPatch, CoordinatorState, IntentErrorRecord, SequencerDecision,
};
use crate::prompts;
use crate::routing::RetryPolicy;
use appweaver_core::{
    generate_error_id, validate_batch, ChatMessage, Domain, Intent, IntentDependency, IntentKind,
    StructuredExtractor, WorkflowFailure,
};
use appweaver_graph::{LogUpdate, Node, NodeError, Update};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Node names used when wiring the coordinator graph.
pub mod names {
    /// Intent classification node.
    pub const CLASSIFY: &str = "classify";
    /// Intent sequencer node.
    pub const SELECT_INTENT: &str = "select_intent";
    /// Success terminal handler.
    pub const SUCCESS: &str = "success";
    /// Error terminal handler.
    pub const ERROR: &str = "error";
    /// Retry handler.
    pub const RETRY: &str = "retry";
}

/// Raw classification output before ids are assigned and the batch is
/// validated.
#[derive(Debug, Deserialize)]
struct ClassificationArgs {
    intents: Vec<IntentDraft>,
    #[serde(default)]
    dependencies: Vec<DependencyDraft>,
}

#[derive(Debug, Deserialize)]
struct IntentDraft {
    domain: Domain,
    action: String,
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    details: String,
}

#[derive(Debug, Deserialize)]
struct DependencyDraft {
    dependent: usize,
    depends_on: usize,
}

fn draft_kind(domain: Domain, action: &str) -> Option<IntentKind> {
    match (domain, action) {
        (Domain::Application, "create") => Some(IntentKind::CreateApplication),
        (Domain::Application, "update") => Some(IntentKind::UpdateApplication),
        (Domain::Application, "delete") => Some(IntentKind::DeleteApplication),
        (Domain::Object, "create") => Some(IntentKind::CreateObject),
        (Domain::Object, "update") => Some(IntentKind::UpdateObject),
        (Domain::Object, "delete") => Some(IntentKind::DeleteObject),
        (Domain::Layout, "create") => Some(IntentKind::CreateLayout),
        (Domain::Layout, "update") => Some(IntentKind::UpdateLayout),
        (Domain::Flow, "create") => Some(IntentKind::CreateFlow),
        (Domain::Flow, "update") => Some(IntentKind::UpdateFlow),
        _ => None,
    }
}

/// Classifies the user request into an intent batch via the extraction
/// collaborator.
///
/// Collaborator noise (provider errors, missing or malformed structured
/// output) is recorded as a transient failure so routing can retry.
/// Batch validation problems are structural and recorded as fatal.
pub struct ClassifyIntentsNode {
    extractor: Arc<dyn StructuredExtractor>,
}

impl ClassifyIntentsNode {
    /// Create the node over an extraction collaborator.
    pub fn new(extractor: Arc<dyn StructuredExtractor>) -> Self {
        Self { extractor }
    }

    fn transient(message: impl Into<String>) -> CoordinatorPatch {
        CoordinatorPatch {
            current_node: Update::set(names::CLASSIFY.to_string()),
            error: Update::set(Some(WorkflowFailure::transient(message))),
            ..CoordinatorPatch::default()
        }
    }

    fn fatal(message: impl Into<String>) -> CoordinatorPatch {
        CoordinatorPatch {
            current_node: Update::set(names::CLASSIFY.to_string()),
            error: Update::set(Some(WorkflowFailure::fatal(message))),
            ..CoordinatorPatch::default()
        }
    }
}

#[async_trait]
impl Node<CoordinatorState> for ClassifyIntentsNode {
    fn name(&self) -> &str {
        names::CLASSIFY
    }

    async fn run(&self, state: &CoordinatorState) -> Result<CoordinatorPatch, NodeError> {
        let messages = [ChatMessage::user(state.user_message.as_str())];
        let tools = [prompts::classify_intents_tool()];

        let invocation = match self
            .extractor
            .extract(prompts::CLASSIFY_INTENTS_PROMPT, &messages, &tools)
            .await
        {
            Ok(invocation) => invocation,
            Err(error) => {
                warn!(%error, "intent classification produced no structured output");
                return Ok(Self::transient(format!("classification failed: {error}")));
            }
        };

        if invocation.tool_name != tools[0].name {
            return Ok(Self::transient(format!(
                "classification selected unexpected tool '{}'",
                invocation.tool_name
            )));
        }

        let args: ClassificationArgs = match serde_json::from_value(invocation.args) {
            Ok(args) => args,
            Err(error) => {
                return Ok(Self::transient(format!(
                    "classification arguments malformed: {error}"
                )));
            }
        };

        let mut intents = Vec::with_capacity(args.intents.len());
        for (index, draft) in args.intents.iter().enumerate() {
            let Some(kind) = draft_kind(draft.domain, &draft.action) else {
                return Ok(Self::transient(format!(
                    "intent {index}: unknown action '{}' for domain '{}'",
                    draft.action, draft.domain
                )));
            };
            intents.push(Intent::new(
                draft.domain,
                kind,
                draft.targets.clone(),
                draft.details.clone(),
            ));
        }
        let dependencies: Vec<IntentDependency> = args
            .dependencies
            .iter()
            .map(|d| IntentDependency {
                dependent: d.dependent,
                depends_on: d.depends_on,
            })
            .collect();

        if let Err(error) = validate_batch(&intents, &dependencies) {
            return Ok(Self::fatal(error.to_string()));
        }

        debug!(count = intents.len(), "classified request into intents");
        Ok(CoordinatorPatch {
            current_node: Update::set(names::CLASSIFY.to_string()),
            transcript: LogUpdate::push(format!(
                "assistant: classified request into {} intent(s)",
                intents.len()
            )),
            intents: Update::set(intents),
            dependencies: Update::set(dependencies),
            current_intent_index: Update::set(0),
            error: Update::Reset,
            ..CoordinatorPatch::default()
        })
    }
}

/// The intent sequencer.
///
/// Pure function of state: decides whether to finish, redirect to an
/// unprocessed dependency, dispatch the current intent to a registered
/// domain, or skip past an unsupported one. Exactly one decision per pass.
pub struct SelectIntentNode {
    supported: HashSet<Domain>,
}

impl SelectIntentNode {
    /// Create the sequencer over the set of dispatchable domains.
    pub fn new(supported: HashSet<Domain>) -> Self {
        Self { supported }
    }
}

#[async_trait]
impl Node<CoordinatorState> for SelectIntentNode {
    fn name(&self) -> &str {
        names::SELECT_INTENT
    }

    async fn run(&self, state: &CoordinatorState) -> Result<CoordinatorPatch, NodeError> {
        let index = state.current_intent_index;

        let Some(intent) = state.current_intent() else {
            // Past the end. Dependency redirects can leave earlier intents
            // unprocessed, so wrap back to the first one before finishing.
            let leftover = (0..state.intents.len()).find(|i| !state.is_processed(*i));
            if let Some(first) = leftover {
                debug!(first, "wrapping back to unprocessed intent");
                return Ok(CoordinatorPatch {
                    current_node: Update::set(names::SELECT_INTENT.to_string()),
                    current_intent_index: Update::set(first),
                    decision: Update::set(Some(SequencerDecision::Continue)),
                    ..CoordinatorPatch::default()
                });
            }
            debug!(processed = state.processed_intents.len(), "batch exhausted");
            return Ok(CoordinatorPatch {
                current_node: Update::set(names::SELECT_INTENT.to_string()),
                decision: Update::set(Some(SequencerDecision::Done)),
                ..CoordinatorPatch::default()
            });
        };

        // Already handled (out of order, via a dependency redirect): step past.
        if state.is_processed(index) {
            return Ok(CoordinatorPatch {
                current_node: Update::set(names::SELECT_INTENT.to_string()),
                current_intent_index: Update::set(index + 1),
                decision: Update::set(Some(SequencerDecision::Continue)),
                ..CoordinatorPatch::default()
            });
        }

        // Dependency redirect: jump to the prerequisite, revisit later.
        if let Some(prerequisite) = state.unprocessed_dependency_of(index) {
            debug!(index, prerequisite, "redirecting to unprocessed dependency");
            return Ok(CoordinatorPatch {
                current_node: Update::set(names::SELECT_INTENT.to_string()),
                current_intent_index: Update::set(prerequisite),
                decision: Update::set(Some(SequencerDecision::Continue)),
                ..CoordinatorPatch::default()
            });
        }

        if self.supported.contains(&intent.domain) {
            return Ok(CoordinatorPatch {
                current_node: Update::set(names::SELECT_INTENT.to_string()),
                decision: Update::set(Some(SequencerDecision::Dispatch(intent.domain))),
                ..CoordinatorPatch::default()
            });
        }

        // Unsupported domain: mark processed and move on so one stray intent
        // cannot stall the batch.
        warn!(index, domain = %intent.domain, "skipping unsupported domain");
        Ok(CoordinatorPatch {
            current_node: Update::set(names::SELECT_INTENT.to_string()),
            processed_intents: LogUpdate::push(index),
            current_intent_index: Update::set(index + 1),
            decision: Update::set(Some(SequencerDecision::Continue)),
            transcript: LogUpdate::push(format!(
                "assistant: skipped intent {index}, domain '{}' not supported",
                intent.domain
            )),
            ..CoordinatorPatch::default()
        })
    }
}

/// Success terminal handler. Idempotent: re-entry after completion changes
/// nothing but the node marker.
pub struct SuccessNode;

#[async_trait]
impl Node<CoordinatorState> for SuccessNode {
    fn name(&self) -> &str {
        names::SUCCESS
    }

    async fn run(&self, state: &CoordinatorState) -> Result<CoordinatorPatch, NodeError> {
        if state.is_completed {
            return Ok(CoordinatorPatch {
                current_node: Update::set(names::SUCCESS.to_string()),
                ..CoordinatorPatch::default()
            });
        }
        Ok(CoordinatorPatch {
            current_node: Update::set(names::SUCCESS.to_string()),
            is_completed: Update::set(true),
            error: Update::Reset,
            transcript: LogUpdate::push(format!(
                "assistant: request completed, {} result(s), {} error(s)",
                state.execution_results.len(),
                state.intent_errors.len()
            )),
            ..CoordinatorPatch::default()
        })
    }
}

/// Error terminal handler. Records the failure as a structured error record
/// and completes the run. Idempotent on re-entry.
pub struct ErrorNode;

#[async_trait]
impl Node<CoordinatorState> for ErrorNode {
    fn name(&self) -> &str {
        names::ERROR
    }

    async fn run(&self, state: &CoordinatorState) -> Result<CoordinatorPatch, NodeError> {
        if state.is_completed {
            return Ok(CoordinatorPatch {
                current_node: Update::set(names::ERROR.to_string()),
                ..CoordinatorPatch::default()
            });
        }
        let message = state
            .error
            .as_ref()
            .map(|failure| failure.message.clone())
            .unwrap_or_else(|| "request failed for an unrecorded reason".to_string());
        let id = state
            .current_intent()
            .map(|intent| intent.id.clone())
            .unwrap_or_else(generate_error_id);
        Ok(CoordinatorPatch {
            current_node: Update::set(names::ERROR.to_string()),
            is_completed: Update::set(true),
            intent_errors: LogUpdate::push(IntentErrorRecord {
                id,
                message: message.clone(),
            }),
            transcript: LogUpdate::push(format!("assistant: request failed: {message}")),
            ..CoordinatorPatch::default()
        })
    }
}

/// Retry handler: counts the attempt and clears the recorded failure so the
/// retried node starts from a clean slate.
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
impl Node<CoordinatorState> for RetryNode {
    fn name(&self) -> &str {
        names::RETRY
    }

    async fn run(&self, state: &CoordinatorState) -> Result<CoordinatorPatch, NodeError> {
        let attempt = state.retry_count + 1;
        if attempt > self.policy.max_attempts {
            // Routing checks the budget before taking the retry edge, so this
            // only fires if a graph wires the handler unconditionally.
            return Ok(CoordinatorPatch {
                current_node: Update::set(names::RETRY.to_string()),
                retry_count: Update::set(attempt),
                error: Update::set(Some(WorkflowFailure::fatal(
                    "maximum retry attempts exceeded",
                ))),
                ..CoordinatorPatch::default()
            });
        }
        debug!(attempt, max = self.policy.max_attempts, "retrying");
        Ok(CoordinatorPatch {
            current_node: Update::set(names::RETRY.to_string()),
            retry_count: Update::set(attempt),
            error: Update::Reset,
            transcript: LogUpdate::push(format!(
                "assistant: retry attempt {attempt} of {}",
                self.policy.max_attempts
            )),
            ..CoordinatorPatch::default()
        })
    }
}
