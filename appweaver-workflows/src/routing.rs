//! Shared routing vocabulary and the canonical decision order.
//!
//! Every router in the system applies the same order:
//!
//! 1. If a failure is recorded: retry while the budget allows and the
//!    failure is transient, otherwise take the error edge.
//! 2. Else, if the node's expected artifact is present and well-formed,
//!    take the happy-path edge.
//! 3. Else treat the missing artifact as transient noise: retry while the
//!    budget allows, otherwise error.

use appweaver_core::WorkflowFailure;

/// Edge labels shared by every workflow.
pub mod labels {
    /// Route to the retry handler.
    pub const RETRY: &str = "retry";
    /// Route to the error terminal.
    pub const ERROR: &str = "error";
    /// Route to the success terminal.
    pub const SUCCESS: &str = "success";
}

/// Per-workflow retry configuration.
///
/// Ceilings deliberately differ per workflow (the coordinator allows a
/// single retry, domain workflows three); each graph declares its own
/// policy instead of sharing a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry handler entries per run.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Create a policy.
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

/// Decision step 1: route a recorded failure.
pub fn failure_route(
    failure: &WorkflowFailure,
    retry_count: u32,
    policy: RetryPolicy,
) -> &'static str {
    if failure.is_transient() && retry_count < policy.max_attempts {
        labels::RETRY
    } else {
        labels::ERROR
    }
}

/// Decision step 3: route a missing artifact with no recorded failure.
pub fn missing_artifact_route(retry_count: u32, policy: RetryPolicy) -> &'static str {
    if retry_count < policy.max_attempts {
        labels::RETRY
    } else {
        labels::ERROR
    }
}
