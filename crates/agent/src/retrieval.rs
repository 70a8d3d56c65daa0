//! Long-term retrieval pipeline: search → select → hydrate
//!
//! Raw archive summaries are rarely enough on their own, so memory_search
//! results never reach the conversation directly. They are parsed into
//! candidates, a model pass picks the ones worth full detail, and each pick
//! is hydrated through memory_get. Every stage degrades instead of failing:
//! garbage input passes through tagged, a failed selection falls back to
//! the summaries.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use engram_memory::parse_relevant_ids;
use engram_provider::{ChatParams, Message, Provider, ToolChoice};

use crate::registry::ProviderRegistry;

/// Records hydrated per search
const MAX_HYDRATED: usize = 3;

/// One search hit, as much of it as could be understood
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: Option<String>,
    pub label: String,
}

/// Parse a raw search payload. A JSON array yields one candidate per
/// element; anything else (non-JSON, non-array) degrades to a single
/// id-less candidate carrying the raw text.
pub fn parse_search_results(raw: &str) -> Vec<Candidate> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => {
            return vec![Candidate {
                id: None,
                label: raw.to_string(),
            }]
        }
    };

    let items = match parsed.as_array() {
        Some(items) => items,
        None => {
            return vec![Candidate {
                id: None,
                label: raw.to_string(),
            }]
        }
    };

    items
        .iter()
        .map(|item| {
            let id = item["id"].as_str().map(str::to_string);
            let name = item["name"]
                .as_str()
                .or_else(|| item["description"].as_str())
                .unwrap_or("");
            let description = item["description"].as_str().unwrap_or("");
            let tags = item["tags"]
                .as_array()
                .map(|t| {
                    t.iter()
                        .filter_map(|v| v.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();

            let mut label = name.to_string();
            if !description.is_empty() && description != name {
                label.push_str(&format!(" - {}", description));
            }
            if !tags.is_empty() {
                label.push_str(&format!(" [{}]", tags));
            }
            if label.is_empty() {
                label = item.to_string();
            }

            Candidate { id, label }
        })
        .collect()
}

/// Ask the model which candidates deserve full detail
async fn select_relevant(
    provider: &Arc<dyn Provider>,
    model: &str,
    query: &str,
    candidates: &[Candidate],
) -> Option<Vec<String>> {
    let mut listing = String::new();
    for candidate in candidates {
        if let Some(id) = &candidate.id {
            listing.push_str(&format!("- id={} {}\n", id, candidate.label));
        }
    }

    let prompt = format!(
        "Long-term memory search hits:\n{}\nQuery: {}\n\n\
         Choose the 1-3 record ids whose full detail is necessary for the \
         query. Reply with JSON only: {{\"relevant_ids\": [<id>, ...]}}.",
        listing, query
    );

    let params = ChatParams {
        model: model.to_string(),
        messages: vec![
            Message::system("You select records for an agent's memory. Reply exactly as asked."),
            Message::user(prompt),
        ],
        max_tokens: 256,
        temperature: 0.0,
        tool_choice: ToolChoice::None,
        tag: "archive-select",
        ..Default::default()
    };

    match provider.chat(params).await {
        Ok(response) => response.content.as_deref().and_then(parse_relevant_ids),
        Err(e) => {
            warn!("archive selection call failed: {}", e);
            None
        }
    }
}

/// Fetch full detail for each selected id; failures are skipped
async fn hydrate(registry: &ProviderRegistry, ids: &[String]) -> Vec<String> {
    let mut blocks = Vec::new();
    for id in ids.iter().take(MAX_HYDRATED) {
        match registry.call("memory_get", json!({ "id": id })).await {
            Ok(content) => {
                blocks.push(format!("[archive {}]\n{}", id, content.joined()));
            }
            Err(e) => {
                warn!(id = %id, "hydration skipped: {}", e);
            }
        }
    }
    blocks
}

/// Raw summaries tagged with provenance; the degraded fallback output
fn tagged_raw(candidates: &[Candidate]) -> String {
    let mut out = String::from("[archive summaries]\n");
    for candidate in candidates {
        match &candidate.id {
            Some(id) => out.push_str(&format!("- ({}) {}\n", id, candidate.label)),
            None => out.push_str(&format!("- {}\n", candidate.label)),
        }
    }
    out
}

/// Run the full pipeline over one memory_search payload
pub async fn refine(
    provider: &Arc<dyn Provider>,
    model: &str,
    registry: &ProviderRegistry,
    query: &str,
    raw: &str,
) -> String {
    let candidates = parse_search_results(raw);
    if candidates.is_empty() {
        return "[archive summaries]\n(no matches)\n".to_string();
    }

    if candidates.iter().all(|c| c.id.is_none()) {
        debug!("search payload had no addressable records, passing through");
        return tagged_raw(&candidates);
    }

    let ids = match select_relevant(provider, model, query, &candidates).await {
        Some(ids) if !ids.is_empty() => ids,
        _ => return tagged_raw(&candidates),
    };

    let blocks = hydrate(registry, &ids).await;
    if blocks.is_empty() {
        return tagged_raw(&candidates);
    }
    blocks.join("\n")
}
