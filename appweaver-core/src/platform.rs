//! Platform change collaborator contract.
//!
//! Stands in for the external low-code platform's write API. Success returns
//! a stable identifier for the touched resource; failure is an error with a
//! message. Used exclusively inside execution-stage nodes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What kind of platform resource a change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// An application.
    Application,
    /// A data object.
    Object,
    /// A field on an object.
    Field,
}

/// The change verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Create a resource.
    Create,
    /// Update a resource.
    Update,
    /// Delete a resource.
    Delete,
    /// Recover a previously deleted resource.
    Recover,
}

/// One change request against the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Change verb.
    pub action: ChangeAction,
    /// Resource payload (name, description, type information, parent ids).
    pub payload: Value,
}

impl ChangeRequest {
    /// Create a new change request.
    pub fn new(kind: ResourceKind, action: ChangeAction, payload: Value) -> Self {
        Self {
            kind,
            action,
            payload,
        }
    }
}

/// Result of an applied change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeOutcome {
    /// Stable identifier of the touched resource.
    pub resource_id: String,
    /// Provider-specific response payload.
    pub payload: Value,
}

impl ChangeOutcome {
    /// Create a new outcome.
    pub fn new(resource_id: impl Into<String>, payload: Value) -> Self {
        Self {
            resource_id: resource_id.into(),
            payload,
        }
    }
}

/// Errors from the platform collaborator.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform rejected the change.
    #[error("platform rejected change: {0}")]
    Rejected(String),

    /// Transport failure.
    #[error("platform unreachable: {0}")]
    Unreachable(String),
}

/// The external platform's write API.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Apply one change, returning the touched resource's identifier.
    async fn apply_change(&self, request: ChangeRequest) -> Result<ChangeOutcome, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_request_serde() {
        let request = ChangeRequest::new(
            ResourceKind::Object,
            ChangeAction::Create,
            json!({"name": "invoice"}),
        );
        let json = serde_json::to_string(&request).unwrap();
        let back: ChangeRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn test_platform_error_display() {
        let err = PlatformError::Rejected("duplicate name".to_string());
        assert!(err.to_string().contains("duplicate name"));
    }
}
