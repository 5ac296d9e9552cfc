//! # appweaver-workflows
//!
//! The coordinator and domain workflows built on `appweaver-graph`.
//!
//! A request enters through [`WorkflowService::run`], which seeds the
//! session's coordinator state and invokes the coordinator graph: classify
//! the request into intents, sequence them dependencies-first, dispatch
//! each to its domain sub-graph (application, object), and finish at a
//! terminal handler. Domain runs are wrapped by [`SubgraphNode`]s that
//! contain failures, so one broken intent costs one error record, not the
//! batch.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod application;
pub mod coordinator;
pub mod dispatcher;
pub mod object;
pub mod prompts;
pub mod routing;
pub mod service;
pub mod subgraph;

// Re-exports
pub use application::ApplicationBridge;
pub use coordinator::{
    build_coordinator_graph, CoordinatorPatch, CoordinatorState, IntentErrorRecord,
    SequencerDecision,
};
pub use dispatcher::DomainDispatcher;
pub use object::ObjectBridge;
pub use routing::RetryPolicy;
pub use service::{
    ErrorPayload, RunData, RunRequest, RunResponse, SuccessPayload, WorkflowService,
};
pub use subgraph::{DomainBridge, SubgraphNode};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        CoordinatorState, DomainBridge, DomainDispatcher, RetryPolicy, RunData, RunRequest,
        RunResponse, SubgraphNode, WorkflowService,
    };
}
