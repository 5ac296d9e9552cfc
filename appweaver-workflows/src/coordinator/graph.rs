//! Coordinator graph wiring.
//!
//! classify → select_intent → (domain sub-graphs | success | error), with a
//! single-attempt retry handler feeding back into whichever stage stalled.
//! Dispatch edges are derived from the [`DomainDispatcher`] registry, so
//! adding a domain never touches this wiring beyond its registration.

use crate::coordinator::nodes::{
    names, ClassifyIntentsNode, ErrorNode, RetryNode, SelectIntentNode, SuccessNode,
};
use crate::coordinator::state::{CoordinatorState, SequencerDecision};
use crate::dispatcher::DomainDispatcher;
use crate::routing::{failure_route, labels, missing_artifact_route, RetryPolicy};
use appweaver_core::{Domain, StructuredExtractor};
use appweaver_graph::{
    Checkpointer, CompiledGraph, GraphBuilder, GraphResult, Router, END, START,
};
use std::collections::HashSet;
use std::sync::Arc;

/// The coordinator allows one retry per request; domain workflows carry
/// their own, larger budgets.
pub const RETRY_POLICY: RetryPolicy = RetryPolicy::new(1);

/// Edge label for looping the sequencer back onto itself.
const NEXT_INTENT: &str = "next_intent";

/// Build the coordinator graph over the registered domain handlers.
pub fn build_coordinator_graph(
    extractor: Arc<dyn StructuredExtractor>,
    dispatcher: DomainDispatcher,
    checkpointer: Option<Arc<dyn Checkpointer<CoordinatorState>>>,
) -> GraphResult<CompiledGraph<CoordinatorState>> {
    let domains: HashSet<Domain> = dispatcher.domains();
    let mut ordered: Vec<Domain> = domains.iter().copied().collect();
    ordered.sort_by_key(|d| d.label());

    let mut builder = GraphBuilder::<CoordinatorState>::new("coordinator")
        .node(names::CLASSIFY, ClassifyIntentsNode::new(extractor))
        .node(names::SELECT_INTENT, SelectIntentNode::new(domains.clone()))
        .node(names::SUCCESS, SuccessNode)
        .node(names::ERROR, ErrorNode)
        .node(names::RETRY, RetryNode::new(RETRY_POLICY))
        .max_steps(100);

    for (domain, node) in dispatcher.into_handlers() {
        builder = builder.node_arc(domain.label(), node);
    }

    // Fresh requests classify; a resumed mid-batch state re-enters the
    // sequencer directly.
    let entry = Router::new(
        "entry",
        &[names::CLASSIFY, "resume"],
        |state: &CoordinatorState| {
            if state.intents.is_empty() || state.is_completed {
                names::CLASSIFY
            } else {
                "resume"
            }
        },
    );
    builder = builder.conditional(
        START,
        entry,
        &[
            (names::CLASSIFY, names::CLASSIFY),
            ("resume", names::SELECT_INTENT),
        ],
    );

    let after_classify = Router::new(
        "after_classify",
        &[names::SELECT_INTENT, labels::RETRY, labels::ERROR],
        |state: &CoordinatorState| match &state.error {
            Some(failure) => failure_route(failure, state.retry_count, RETRY_POLICY),
            None if !state.intents.is_empty() => names::SELECT_INTENT,
            None => missing_artifact_route(state.retry_count, RETRY_POLICY),
        },
    );
    builder = builder.conditional(
        names::CLASSIFY,
        after_classify,
        &[
            (names::SELECT_INTENT, names::SELECT_INTENT),
            (labels::RETRY, names::RETRY),
            (labels::ERROR, names::ERROR),
        ],
    );

    let mut select_labels: Vec<&'static str> = vec![labels::SUCCESS, NEXT_INTENT, labels::ERROR];
    let mut select_targets: Vec<(&'static str, &str)> = vec![
        (labels::SUCCESS, names::SUCCESS),
        (NEXT_INTENT, names::SELECT_INTENT),
        (labels::ERROR, names::ERROR),
    ];
    for domain in &ordered {
        select_labels.push(domain.label());
        select_targets.push((domain.label(), domain.label()));
    }
    let registered = domains.clone();
    let after_select = Router::new(
        "after_select",
        &select_labels,
        move |state: &CoordinatorState| match state.decision {
            Some(SequencerDecision::Done) => labels::SUCCESS,
            Some(SequencerDecision::Continue) => NEXT_INTENT,
            Some(SequencerDecision::Dispatch(domain)) if registered.contains(&domain) => {
                domain.label()
            }
            _ => labels::ERROR,
        },
    );
    builder = builder.conditional(names::SELECT_INTENT, after_select, &select_targets);

    for domain in &ordered {
        let after_domain = Router::new(
            format!("after_{}", domain.label()),
            &[NEXT_INTENT, labels::RETRY, labels::ERROR],
            |state: &CoordinatorState| match &state.error {
                Some(failure) => failure_route(failure, state.retry_count, RETRY_POLICY),
                None => NEXT_INTENT,
            },
        );
        builder = builder.conditional(
            domain.label(),
            after_domain,
            &[
                (NEXT_INTENT, names::SELECT_INTENT),
                (labels::RETRY, names::RETRY),
                (labels::ERROR, names::ERROR),
            ],
        );
    }

    let after_retry = Router::new(
        "after_retry",
        &[names::CLASSIFY, names::SELECT_INTENT, labels::ERROR],
        |state: &CoordinatorState| {
            if state.error.is_some() {
                labels::ERROR
            } else if state.intents.is_empty() {
                names::CLASSIFY
            } else {
                names::SELECT_INTENT
            }
        },
    );
    builder = builder.conditional(
        names::RETRY,
        after_retry,
        &[
            (names::CLASSIFY, names::CLASSIFY),
            (names::SELECT_INTENT, names::SELECT_INTENT),
            (labels::ERROR, names::ERROR),
        ],
    );

    builder = builder.edge(names::SUCCESS, END).edge(names::ERROR, END);

    if let Some(store) = checkpointer {
        builder = builder.checkpointer(store);
    }

    builder.build()
}
