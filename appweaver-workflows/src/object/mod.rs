//! The object domain workflow: classify the operation, design the object
//! and its fields, validate the design, then apply it as a resumable step
//! plan against the platform.

pub mod bridge;
pub mod graph;
pub mod nodes;
pub mod state;

pub use bridge::ObjectBridge;
pub use graph::build_object_graph;
pub use state::{FieldSpec, ObjectOperation, ObjectPatch, ObjectSpec, ObjectState};
