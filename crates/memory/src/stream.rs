//! Memory stream: append-only condensed interaction log
//!
//! Every interaction is compressed into a one-sentence summary at record
//! time, so a whole task history fits in the prompt at O(1) cost per record.
//! Full content stays in the unit and is only rehydrated when `retrieve`
//! decides a query actually needs it. Summarization and selection failures
//! never propagate: a failed summary falls back to truncated content, a
//! failed retrieval to the empty string.

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use engram_provider::{ChatParams, Message, Provider, ToolChoice};

use crate::TaskId;

/// Content at or under this length is its own summary; no model call
const VERBATIM_SUMMARY_CHARS: usize = 120;

/// Fallback summary length when the model call fails
const FALLBACK_SUMMARY_CHARS: usize = 160;

/// Upper bound on units rehydrated per retrieval
const MAX_RECALL_UNITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One condensed interaction record. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryUnit {
    pub id: u64,
    pub task_id: TaskId,
    pub turn_id: u32,
    pub role: Role,
    pub summary: String,
    pub content: String,
    pub tool_name: Option<String>,
    pub tool_args: Option<String>,
    pub related_id: Option<u64>,
    pub timestamp: DateTime<Local>,
}

/// Selector reply shape for retrieval
#[derive(Debug, Deserialize)]
struct RelevantIds {
    relevant_ids: Vec<Value>,
}

/// Extract a `{"relevant_ids": [...]}` object from model output. Ids may be
/// numbers or strings (stream units use numbers, archive records uuids).
/// Tolerates fenced code blocks and surrounding prose; None when nothing
/// parses.
pub fn parse_relevant_ids(output: &str) -> Option<Vec<String>> {
    let trimmed = output.trim();

    let window = if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        }
    } else {
        trimmed
    };

    let json_str = match (window.find('{'), window.rfind('}')) {
        (Some(start), Some(end)) if start < end => &window[start..=end],
        _ => return None,
    };

    serde_json::from_str::<RelevantIds>(json_str).ok().map(|r| {
        r.relevant_ids
            .into_iter()
            .filter_map(|v| match v {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()
    })
}

/// Append-only log with summarize-on-record and choose-then-hydrate recall
pub struct MemoryStream {
    units: Vec<MemoryUnit>,
    next_id: u64,
    provider: Arc<dyn Provider>,
    summary_model: String,
}

impl MemoryStream {
    pub fn new(provider: Arc<dyn Provider>, summary_model: impl Into<String>) -> Self {
        Self {
            units: Vec::new(),
            next_id: 0,
            provider,
            summary_model: summary_model.into(),
        }
    }

    /// Record a user message. Short content is its own summary.
    pub async fn record_user(
        &mut self,
        content: impl Into<String>,
        turn_id: u32,
        task_id: TaskId,
    ) -> MemoryUnit {
        let content = content.into();
        let summary = if content.chars().count() <= VERBATIM_SUMMARY_CHARS {
            content.clone()
        } else {
            self.summarize(&format!("The user said:\n{}", content)).await
                .unwrap_or_else(|| fallback_summary(&content))
        };
        self.append(task_id, turn_id, Role::User, summary, content, None, None, None)
    }

    /// Record an assistant message; always model-summarized
    pub async fn record_assistant(
        &mut self,
        content: impl Into<String>,
        turn_id: u32,
        task_id: TaskId,
    ) -> MemoryUnit {
        let content = content.into();
        let summary = self
            .summarize(&format!("The assistant said:\n{}", content))
            .await
            .unwrap_or_else(|| fallback_summary(&content));
        self.append(
            task_id,
            turn_id,
            Role::Assistant,
            summary,
            content,
            None,
            None,
            None,
        )
    }

    /// Record a tool result. The tool name and arguments are handed to the
    /// summarizer so the summary names the operation and its key
    /// identifiers (paths, ids).
    #[allow(clippy::too_many_arguments)]
    pub async fn record_tool(
        &mut self,
        tool_name: &str,
        args: &Value,
        output: impl Into<String>,
        turn_id: u32,
        task_id: TaskId,
        related_id: Option<u64>,
    ) -> MemoryUnit {
        let output = output.into();
        let args_text = args.to_string();
        let summary = self
            .summarize(&format!(
                "Tool `{}` was called with arguments {} and produced:\n{}",
                tool_name, args_text, output
            ))
            .await
            .unwrap_or_else(|| format!("{}: {}", tool_name, fallback_summary(&output)));

        self.append(
            task_id,
            turn_id,
            Role::Tool,
            summary,
            output,
            Some(tool_name.to_string()),
            Some(args_text),
            related_id,
        )
    }

    /// Pick the units whose full detail a query needs and render them as
    /// delimited blocks. Empty string when the task has no units, when the
    /// selector picks nothing, or on any failure.
    pub async fn retrieve(&self, query: &str, task_id: TaskId) -> String {
        let units: Vec<&MemoryUnit> = self.units_for(task_id).collect();
        if units.is_empty() {
            return String::new();
        }

        let mut listing = String::new();
        for unit in &units {
            listing.push_str(&format!(
                "- id={} [{} turn={}] {}\n",
                unit.id,
                unit.role.as_str(),
                unit.turn_id,
                unit.summary
            ));
        }

        let prompt = format!(
            "Memory records for the current task:\n{}\n\
             Query: {}\n\n\
             Choose the 1-3 record ids whose FULL detail is necessary to \
             answer the query. Summaries above are already known; pick only \
             records whose complete content adds something. Reply with JSON \
             only: {{\"relevant_ids\": [<id>, ...]}}. Use an empty array if \
             none qualify.",
            listing, query
        );

        let selection = match self.call_model(&prompt, "recall-select").await {
            Some(text) => text,
            None => return String::new(),
        };

        let ids: Vec<u64> = match parse_relevant_ids(&selection) {
            Some(ids) => ids.iter().filter_map(|s| s.parse().ok()).collect(),
            None => {
                warn!("recall selector reply did not parse, degrading to empty");
                return String::new();
            }
        };

        let mut blocks = String::new();
        for id in ids.into_iter().take(MAX_RECALL_UNITS) {
            // Unknown ids are silently dropped
            if let Some(unit) = units.iter().find(|u| u.id == id) {
                blocks.push_str(&format!(
                    "[memory {} | {} turn {}]\n{}\n[end memory {}]\n",
                    unit.id,
                    unit.role.as_str(),
                    unit.turn_id,
                    unit.content,
                    unit.id
                ));
            }
        }
        blocks
    }

    pub fn units_for(&self, task_id: TaskId) -> impl Iterator<Item = &MemoryUnit> {
        self.units.iter().filter(move |u| u.task_id == task_id)
    }

    pub fn get(&self, id: u64) -> Option<&MemoryUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[allow(clippy::too_many_arguments)]
    fn append(
        &mut self,
        task_id: TaskId,
        turn_id: u32,
        role: Role,
        summary: String,
        content: String,
        tool_name: Option<String>,
        tool_args: Option<String>,
        related_id: Option<u64>,
    ) -> MemoryUnit {
        let unit = MemoryUnit {
            id: self.next_id,
            task_id,
            turn_id,
            role,
            summary,
            content,
            tool_name,
            tool_args,
            related_id,
            timestamp: Local::now(),
        };
        self.next_id += 1;
        debug!(id = unit.id, %task_id, turn_id, role = role.as_str(), "memory unit recorded");
        self.units.push(unit.clone());
        unit
    }

    /// One-sentence condensation; None on any failure
    async fn summarize(&self, record: &str) -> Option<String> {
        let prompt = format!(
            "{}\n\nCondense the above into one short sentence. Keep concrete \
             identifiers (paths, keys, ids, numbers). Reply with the sentence \
             only.",
            record
        );
        self.call_model(&prompt, "summarize")
            .await
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    async fn call_model(&self, prompt: &str, tag: &'static str) -> Option<String> {
        let params = ChatParams {
            model: self.summary_model.clone(),
            messages: vec![
                Message::system(
                    "You maintain an agent's memory. Answer exactly as asked, nothing else.",
                ),
                Message::user(prompt),
            ],
            max_tokens: 512,
            temperature: 0.0,
            tool_choice: ToolChoice::None,
            tag,
            ..Default::default()
        };

        match self.provider.chat(params).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(tag, "memory model call failed: {}", e);
                None
            }
        }
    }
}

fn fallback_summary(content: &str) -> String {
    let one_line = content.replace('\n', " ");
    let mut out: String = one_line.chars().take(FALLBACK_SUMMARY_CHARS).collect();
    if one_line.chars().count() > FALLBACK_SUMMARY_CHARS {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_relevant_ids_plain() {
        assert_eq!(
            parse_relevant_ids(r#"{"relevant_ids": [3, 7]}"#),
            Some(vec!["3".to_string(), "7".to_string()])
        );
    }

    #[test]
    fn parse_relevant_ids_accepts_string_ids() {
        assert_eq!(
            parse_relevant_ids(r#"{"relevant_ids": ["abc-123"]}"#),
            Some(vec!["abc-123".to_string()])
        );
    }

    #[test]
    fn parse_relevant_ids_fenced() {
        let output = "Here you go:\n```json\n{\"relevant_ids\": [1]}\n```";
        assert_eq!(parse_relevant_ids(output), Some(vec!["1".to_string()]));
    }

    #[test]
    fn parse_relevant_ids_embedded_in_prose() {
        let output = "The relevant records are {\"relevant_ids\": [2]} as requested.";
        assert_eq!(parse_relevant_ids(output), Some(vec!["2".to_string()]));
    }

    #[test]
    fn parse_relevant_ids_rejects_garbage() {
        assert_eq!(parse_relevant_ids("no json here"), None);
        assert_eq!(parse_relevant_ids(r#"{"ids": [1]}"#), None);
        assert_eq!(parse_relevant_ids(""), None);
    }

    #[test]
    fn parse_relevant_ids_empty_array() {
        assert_eq!(parse_relevant_ids(r#"{"relevant_ids": []}"#), Some(vec![]));
    }

    #[test]
    fn fallback_summary_clamps() {
        let long = "x".repeat(500);
        let summary = fallback_summary(&long);
        assert_eq!(summary.chars().count(), FALLBACK_SUMMARY_CHARS + 1);
        assert!(summary.ends_with('…'));
    }
}
