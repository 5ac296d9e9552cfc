//! # appweaver-core
//!
//! Core types, collaborator contracts, and error handling for appweaver.
//!
//! This crate holds everything the orchestration layers share: intents and
//! their dependency validation, execution results with partial-resume
//! bookkeeping, the structured-extraction and platform-write collaborator
//! traits, failure classification for routing, and id generation. Mock
//! collaborators for tests live in [`testing`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod errors;
pub mod execution;
pub mod extractor;
pub mod identifier;
pub mod intent;
pub mod message;
pub mod platform;
pub mod testing;

// Re-exports
pub use errors::{CoreError, FailureKind, Result, WorkflowFailure};
pub use execution::{CompletedStep, ExecutionResult, ExecutionStatus, StepKind};
pub use extractor::{ExtractionError, StructuredExtractor, ToolInvocation, ToolSchema};
pub use identifier::{generate_error_id, generate_intent_id, generate_session_id};
pub use intent::{validate_batch, Domain, Intent, IntentDependency, IntentKind};
pub use message::{ChatMessage, ChatRole};
pub use platform::{
    ChangeAction, ChangeOutcome, ChangeRequest, PlatformClient, PlatformError, ResourceKind,
};
