//! Archive exposed through the tool-provider contract

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use engram_provider::{ToolContent, ToolError, ToolProvider, ToolSpec};

use crate::Archive;

pub struct ArchiveProvider {
    archive: Archive,
}

impl ArchiveProvider {
    pub fn new(archive: Archive) -> Self {
        Self { archive }
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

#[derive(Deserialize)]
struct GetArgs {
    id: String,
}

#[derive(Deserialize)]
struct SaveArgs {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    content: String,
}

#[async_trait]
impl ToolProvider for ArchiveProvider {
    fn list_tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "memory_search",
                "Search long-term memory. Returns a JSON array of record \
                 summaries {id, name, description, tags}; fetch full detail \
                 with memory_get.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search terms" }
                    },
                    "required": ["query"]
                }),
            ),
            ToolSpec::new(
                "memory_get",
                "Fetch one long-term memory record in full by id.",
                json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Record id from memory_search" }
                    },
                    "required": ["id"]
                }),
            ),
            ToolSpec::new(
                "memory_save",
                "Store a fact in long-term memory for future sessions.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Short record name" },
                        "description": { "type": "string", "description": "One-line gloss" },
                        "tags": { "type": "array", "items": { "type": "string" } },
                        "content": { "type": "string", "description": "Full detail to store" }
                    },
                    "required": ["name", "content"]
                }),
            ),
        ]
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolContent, ToolError> {
        match name {
            "memory_search" => {
                let args: SearchArgs = serde_json::from_value(args)
                    .map_err(|e| ToolError::Execution(format!("bad arguments: {}", e)))?;
                let records = self
                    .archive
                    .search(&args.query)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                let summaries: Vec<Value> = records.iter().map(|r| r.summary()).collect();
                Ok(ToolContent::text(
                    serde_json::to_string(&summaries)
                        .map_err(|e| ToolError::Execution(e.to_string()))?,
                ))
            }
            "memory_get" => {
                let args: GetArgs = serde_json::from_value(args)
                    .map_err(|e| ToolError::Execution(format!("bad arguments: {}", e)))?;
                match self
                    .archive
                    .get(&args.id)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?
                {
                    Some(record) => Ok(ToolContent::text(record.content)),
                    None => Err(ToolError::Execution(format!("no record with id {}", args.id))),
                }
            }
            "memory_save" => {
                let args: SaveArgs = serde_json::from_value(args)
                    .map_err(|e| ToolError::Execution(format!("bad arguments: {}", e)))?;
                let record = self
                    .archive
                    .save(args.name, args.description, args.tags, args.content)
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;
                Ok(ToolContent::text(format!("saved as {}", record.id)))
            }
            other => Err(ToolError::Unknown(other.to_string())),
        }
    }
}
