//! Workflow state and patch merging.
//!
//! Every node returns a *patch*, a partial update that the engine merges into
//! the run's state. Fields carry one of two merge disciplines:
//!
//! - [`Update`] for overwrite-latest fields: a patch either supplies a new
//!   value, resets the field to its default, or leaves it untouched.
//! - [`LogUpdate`] for accumulating fields: patches append, never replace.
//!
//! The `Reset` variant is the merge-level "restore declared default"
//! instruction. It is consumed during [`WorkflowState::apply`] and never
//! appears in a state snapshot, so checkpoints round-trip through JSON
//! without any sentinel values.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

/// Merge instruction for an overwrite-latest field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update<T> {
    /// Leave the current value in place.
    Keep,
    /// Replace the current value.
    Set(T),
    /// Restore the field's declared default.
    Reset,
}

impl<T> Default for Update<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> Update<T> {
    /// Shorthand for `Update::Set`.
    pub fn set(value: T) -> Self {
        Self::Set(value)
    }

    /// True if this update leaves the field untouched.
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Merge into the target slot.
    pub fn apply(self, slot: &mut T)
    where
        T: Default,
    {
        match self {
            Self::Keep => {}
            Self::Set(value) => *slot = value,
            Self::Reset => *slot = T::default(),
        }
    }
}

/// Merge instruction for an accumulating list field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogUpdate<T> {
    /// Leave the log untouched.
    Keep,
    /// Append entries to the log.
    Append(Vec<T>),
    /// Restore the log to its declared default (empty).
    Reset,
}

impl<T> Default for LogUpdate<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> LogUpdate<T> {
    /// Append a single entry.
    pub fn push(entry: T) -> Self {
        Self::Append(vec![entry])
    }

    /// Merge into the target log by concatenation.
    pub fn apply(self, log: &mut Vec<T>) {
        match self {
            Self::Keep => {}
            Self::Append(entries) => log.extend(entries),
            Self::Reset => log.clear(),
        }
    }

    /// Merge into the target log, skipping entries already present.
    ///
    /// Used for processed-intent index lists, where an index is recorded
    /// exactly once no matter how many patches mention it.
    pub fn apply_dedup(self, log: &mut Vec<T>)
    where
        T: PartialEq,
    {
        match self {
            Self::Keep => {}
            Self::Append(entries) => {
                for entry in entries {
                    if !log.contains(&entry) {
                        log.push(entry);
                    }
                }
            }
            Self::Reset => log.clear(),
        }
    }
}

/// A partial state update produced by a node.
///
/// Patches are pure data; the only requirement beyond that is a constructor
/// the executor uses to convert an unexpected node failure into a normal
/// error patch, so defects never abort a run mid-flight.
pub trait StatePatch: Debug + Send + Sync + 'static {
    /// Build the patch recorded when a node's `run` returns `Err`.
    fn for_node_error(node: &str, message: &str) -> Self;
}

/// State owned by one workflow run.
///
/// [`WorkflowState::apply`] is the single mutation path: nodes never touch
/// state directly. States are serializable so a checkpoint store can
/// round-trip them losslessly.
pub trait WorkflowState:
    Clone + Debug + Default + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// The patch type nodes produce for this state.
    type Patch: StatePatch;

    /// Merge a patch into this state.
    fn apply(&mut self, patch: Self::Patch);
}

/// Configuration for one invocation of a compiled graph.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Run identity, used as the checkpoint key. Generated if absent.
    pub thread_id: Option<String>,
    /// Step ceiling override; the graph's own ceiling applies when absent.
    pub max_steps: Option<u32>,
}

impl RunConfig {
    /// Create a config for a specific thread.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    /// Override the step ceiling.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = Some(max);
        self
    }
}

/// Outcome of running a compiled graph to a terminal node.
#[derive(Debug, Clone)]
pub struct RunReport<S> {
    /// Final state after the terminal node's patch.
    pub state: S,
    /// Number of node executions.
    pub steps: u32,
    /// Node names in execution order.
    pub visited: Vec<String>,
    /// The run identity used for checkpointing.
    pub thread_id: String,
}

/// Generate a unique run/thread identifier.
pub fn generate_thread_id() -> String {
    format!("run_{}", Uuid::new_v4().simple())
}
