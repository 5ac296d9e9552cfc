//! The coordinator workflow: classify a request into intents, sequence them
//! (dependencies first), dispatch each to its domain sub-graph, and finish
//! at a terminal handler.

pub mod graph;
pub mod nodes;
pub mod state;

pub use graph::{build_coordinator_graph, RETRY_POLICY};
pub use nodes::{names, ClassifyIntentsNode, ErrorNode, RetryNode, SelectIntentNode, SuccessNode};
pub use state::{CoordinatorPatch, CoordinatorState, IntentErrorRecord, SequencerDecision};
