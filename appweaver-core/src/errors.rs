//! Error and failure types shared across appweaver crates.
//!
//! Two layers live here:
//!
//! - [`CoreError`]: the programmer-facing error hierarchy.
//! - [`WorkflowFailure`]: the *in-state* failure record nodes write into
//!   their patches. Routers use its [`FailureKind`] to decide between the
//!   retry and error edges: transient extraction noise is retried, structural
//!   validation problems are not.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for appweaver operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Structured extraction produced nothing usable.
    #[error(transparent)]
    Extraction(#[from] crate::extractor::ExtractionError),

    /// Platform change request failed.
    #[error(transparent)]
    Platform(#[from] crate::platform::PlatformError),

    /// Intent validation failed.
    #[error("Intent validation failed: {0}")]
    IntentValidation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// How a recorded failure should be treated by routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Worth retrying: collaborator noise, missing structured output.
    Transient,
    /// Not worth retrying: structural validation problems, exhausted
    /// retries, total execution failure.
    Fatal,
}

/// A failure recorded in workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowFailure {
    /// Human-readable message.
    pub message: String,
    /// Routing class.
    pub kind: FailureKind,
}

impl WorkflowFailure {
    /// Record a transient failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Transient,
        }
    }

    /// Record a fatal failure.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Fatal,
        }
    }

    /// True if routing may send this failure to the retry handler.
    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

impl std::fmt::Display for WorkflowFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert!(WorkflowFailure::transient("no structured response").is_transient());
        assert!(!WorkflowFailure::fatal("circular dependency").is_transient());
    }

    #[test]
    fn test_failure_serde_round_trip() {
        let failure = WorkflowFailure::fatal("duplicate field names");
        let json = serde_json::to_string(&failure).unwrap();
        let back: WorkflowFailure = serde_json::from_str(&json).unwrap();
        assert_eq!(failure, back);
    }

    #[test]
    fn test_core_error_display() {
        let err = CoreError::IntentValidation("empty intent list".to_string());
        assert!(err.to_string().contains("empty intent list"));
    }
}
