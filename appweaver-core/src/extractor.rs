//! Structured extraction collaborator contract.
//!
//! Stands in for the language-model call: given a system prompt, the
//! conversation so far, and a set of named tool schemas, the collaborator
//! either returns a tool name plus arguments matching one of the schemas or
//! signals that no structured response was produced. The engine treats the
//! call as opaque.

use crate::message::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A named JSON-schema-like tool shape offered to the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name the extractor may select.
    pub name: String,
    /// Short description of when to use the tool.
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: Value,
}

impl ToolSchema {
    /// Create a new tool schema.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A structured response: the selected tool plus its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the selected tool.
    pub tool_name: String,
    /// Arguments conforming to the tool's schema.
    pub args: Value,
}

impl ToolInvocation {
    /// Create a new invocation.
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
        }
    }
}

/// Errors from the extraction collaborator.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The collaborator produced no usable structured response.
    #[error("no structured response produced")]
    NoStructuredResponse,

    /// The collaborator selected a tool that was not offered.
    #[error("unknown tool selected: {0}")]
    UnknownTool(String),

    /// Transport or provider failure.
    #[error("extraction provider error: {0}")]
    Provider(String),
}

/// The language-model-backed structured extraction collaborator.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Produce a structured response for the given prompt and tools.
    async fn extract(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ToolInvocation, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_schema_construction() {
        let schema = ToolSchema::new(
            "classify_intents",
            "Classify a request into intents",
            json!({"type": "object"}),
        );
        assert_eq!(schema.name, "classify_intents");
    }

    #[test]
    fn test_extraction_error_display() {
        assert_eq!(
            ExtractionError::NoStructuredResponse.to_string(),
            "no structured response produced"
        );
    }
}
