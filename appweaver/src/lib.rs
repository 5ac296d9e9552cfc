//! # appweaver
//!
//! Graph-driven intent orchestration for building applications on a
//! low-code platform through conversation.
//!
//! A user request is classified into *intents* (create an application, add
//! an object, ...), sequenced so dependencies run first, and dispatched to
//! per-domain workflows that design, validate, and apply each change
//! against the platform. Everything runs on a small graph engine with
//! mergeable state patches, strict build-time wiring validation, and
//! thread-keyed checkpointing for multi-turn sessions.
//!
//! ## Quick Start
//!
//! ```ignore
//! use appweaver::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = WorkflowService::new(extractor, platform, Some(checkpointer))?;
//!
//!     let response = service
//!         .run(RunRequest::new("build a crm with a contacts object"))
//!         .await;
//!     println!("{}: {:?}", response.success, response.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The workspace is organized as focused crates:
//!
//! - [`appweaver_core`] - intents, execution results, collaborator
//!   contracts, failure classification, test mocks
//! - [`appweaver_graph`] - the graph engine: state patches, nodes,
//!   routers, builder validation, executor, checkpointing
//! - [`appweaver_workflows`] - the coordinator, the application and object
//!   workflows, and the [`WorkflowService`](appweaver_workflows::WorkflowService)
//!   run surface

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub use appweaver_core as core;
pub use appweaver_graph as graph;
pub use appweaver_workflows as workflows;

pub use appweaver_core::{
    ChatMessage, Domain, ExecutionResult, ExecutionStatus, Intent, IntentDependency, IntentKind,
    PlatformClient, StructuredExtractor, WorkflowFailure,
};
pub use appweaver_graph::{
    Checkpointer, CompiledGraph, FileCheckpointer, GraphBuilder, GraphError, InMemoryCheckpointer,
    Node, Router, RunConfig, RunReport,
};
pub use appweaver_workflows::{
    DomainBridge, DomainDispatcher, RunData, RunRequest, RunResponse, WorkflowService,
};

/// Prelude for common imports.
pub mod prelude {
    pub use appweaver_core::{
        ChatMessage, Domain, ExecutionResult, ExecutionStatus, Intent, IntentKind,
        PlatformClient, StructuredExtractor,
    };
    pub use appweaver_graph::prelude::*;
    pub use appweaver_workflows::prelude::*;
}
