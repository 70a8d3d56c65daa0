//! Tool-provider transport contract
//!
//! External tool providers (workspace ops, code execution, the long-term
//! archive) are all invoked through this one interface: advertise tools,
//! call a tool by name, get text content back. Failures are values; the
//! loop converts them into error-kind results for the model to react to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),

    #[error("{0}")]
    Execution(String),
}

/// One advertised tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// One piece of tool output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Tool call result: a list of content parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContent {
    pub content: Vec<ContentPart>,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart {
                kind: "text".to_string(),
                text: text.into(),
            }],
        }
    }

    /// All text parts concatenated
    pub fn joined(&self) -> String {
        self.content
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An external tool provider
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn list_tools(&self) -> Vec<ToolSpec>;
    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolContent, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_spec_serializes_with_mcp_field_names() {
        let spec = ToolSpec::new("memory_search", "search the archive", json!({"type": "object"}));
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["name"], "memory_search");
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn content_part_serializes_type_field() {
        let content = ToolContent::text("hello");
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "hello");
    }

    #[test]
    fn joined_concatenates_parts() {
        let content = ToolContent {
            content: vec![
                ContentPart {
                    kind: "text".to_string(),
                    text: "a".to_string(),
                },
                ContentPart {
                    kind: "text".to_string(),
                    text: "b".to_string(),
                },
            ],
        };
        assert_eq!(content.joined(), "a\nb");
    }
}
