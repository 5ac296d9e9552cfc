//! The application domain workflow: classify the operation, design the
//! application, validate the design, apply it to the platform.

pub mod bridge;
pub mod graph;
pub mod nodes;
pub mod state;

pub use bridge::ApplicationBridge;
pub use graph::build_application_graph;
pub use state::{ApplicationOperation, ApplicationPatch, ApplicationSpec, ApplicationState};
