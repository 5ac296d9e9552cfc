//! System prompts and tool schemas handed to the extraction collaborator.
//!
//! Domain plumbing: these feed the extractor, the engine never inspects
//! their content.

use appweaver_core::ToolSchema;
use serde_json::json;

/// System prompt for the coordinator's intent classification stage.
pub const CLASSIFY_INTENTS_PROMPT: &str = "You are an intent classifier for a low-code \
application platform. Break the user's request into discrete intents, each targeting one \
domain (application, object, layout, flow) with one action. Record dependencies between \
intents by index when one must be applied before another.";

/// System prompt for the application workflow's operation stage.
pub const CLASSIFY_APPLICATION_PROMPT: &str = "Determine which application operation the \
request asks for: create, update, or delete, and the application name it targets.";

/// System prompt for the application design stage.
pub const DESIGN_APPLICATION_PROMPT: &str = "Design the application the request asks for. \
Produce a name and a short description.";

/// System prompt for the object workflow's operation stage.
pub const CLASSIFY_OBJECT_PROMPT: &str = "Determine which object operation the request asks \
for: create, update, or delete, and the object name it targets.";

/// System prompt for the object design stage.
pub const DESIGN_OBJECT_PROMPT: &str = "Design the data object the request asks for. Produce \
a name, a description, and the list of fields with their types.";

/// Tool schema for intent classification.
pub fn classify_intents_tool() -> ToolSchema {
    ToolSchema::new(
        "classify_intents",
        "Classify a user request into platform intents with dependencies",
        json!({
            "type": "object",
            "properties": {
                "intents": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "domain": {"type": "string", "enum": ["application", "object", "layout", "flow"]},
                            "action": {"type": "string"},
                            "targets": {"type": "array", "items": {"type": "string"}},
                            "details": {"type": "string"}
                        },
                        "required": ["domain", "action"]
                    }
                },
                "dependencies": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "dependent": {"type": "integer"},
                            "depends_on": {"type": "integer"}
                        },
                        "required": ["dependent", "depends_on"]
                    }
                }
            },
            "required": ["intents"]
        }),
    )
}

/// Tool schema for the application operation stage.
pub fn classify_application_tool() -> ToolSchema {
    ToolSchema::new(
        "classify_application_operation",
        "Pick the application operation and target",
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["create", "update", "delete"]},
                "target": {"type": "string"}
            },
            "required": ["action", "target"]
        }),
    )
}

/// Tool schema for the application design stage.
pub fn design_application_tool() -> ToolSchema {
    ToolSchema::new(
        "design_application",
        "Produce an application specification",
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "description": {"type": "string"}
            },
            "required": ["name"]
        }),
    )
}

/// Tool schema for the object operation stage.
pub fn classify_object_tool() -> ToolSchema {
    ToolSchema::new(
        "classify_object_operation",
        "Pick the object operation and target",
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["create", "update", "delete"]},
                "target": {"type": "string"}
            },
            "required": ["action", "target"]
        }),
    )
}

/// Tool schema for the object design stage.
pub fn design_object_tool() -> ToolSchema {
    ToolSchema::new(
        "design_object",
        "Produce an object specification with fields",
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "description": {"type": "string"},
                "fields": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "field_type": {"type": "string"},
                            "required": {"type": "boolean"}
                        },
                        "required": ["name", "field_type"]
                    }
                }
            },
            "required": ["name"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_are_stable() {
        assert_eq!(classify_intents_tool().name, "classify_intents");
        assert_eq!(
            classify_application_tool().name,
            "classify_application_operation"
        );
        assert_eq!(design_object_tool().name, "design_object");
    }
}
