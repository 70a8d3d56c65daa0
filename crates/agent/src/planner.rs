//! Planner: turn a user goal into an ordered step list, or declare that no
//! plan is needed. Strictly advisory; a parse failure is thrown and the
//! orchestrator proceeds unplanned.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use engram_provider::{ChatParams, Message, Provider, Tool, ToolChoice};

use crate::{AgentError, Result};

const PLANNER_PROMPT: &str = "You are the planning stage of a tool-using \
agent. Given the user's request, first judge its complexity.

- Trivial or conversational requests (greetings, one-fact questions, small \
talk) need NO plan: return an empty steps array and say why in reasoning.
- Complex requests get a plan: atomic steps in logical order, each step one \
concrete action. Name a suggested tool for a step only when one clearly \
fits.
- If the request implies recalling past information (\"what did we\", \
\"last time\", \"again\", \"the one from before\"), the FIRST step must be a \
memory_search.
- If the request deserves a task title, set task_title.

You may not call tools here. Reply with JSON only (a fenced block is fine):
{\"reasoning\": \"...\", \"steps\": [{\"id\": 1, \"description\": \"...\", \
\"tool\": \"optional-tool-name\", \"dependencies\": []}], \
\"task_title\": \"optional\"}";

#[derive(Debug, Clone, Deserialize)]
pub struct PlanStep {
    pub id: u32,
    pub description: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub reasoning: String,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub task_title: Option<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step list restated verbatim, for the per-turn prompt
    pub fn render_steps(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&format!("{}. {}", step.id, step.description));
            if let Some(tool) = &step.tool {
                out.push_str(&format!(" (tool: {})", tool));
            }
            if !step.dependencies.is_empty() {
                let deps: Vec<String> =
                    step.dependencies.iter().map(|d| d.to_string()).collect();
                out.push_str(&format!(" [after {}]", deps.join(", ")));
            }
            out.push('\n');
        }
        out
    }
}

/// Extract the JSON object from planner output: fenced block first, then
/// the outermost brace window.
pub(crate) fn extract_json(output: &str) -> Option<&str> {
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

    match (window.find('{'), window.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&window[start..=end]),
        _ => None,
    }
}

pub struct Planner {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
}

impl Planner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
        }
    }

    /// Ask the model for a plan. `prior` carries best-effort recall context;
    /// `tools` are shown for awareness but cannot be invoked here.
    pub async fn plan(&self, goal: &str, prior: &[Message], tools: &[Tool]) -> Result<Plan> {
        let mut system = PLANNER_PROMPT.to_string();
        if !tools.is_empty() {
            system.push_str("\n\nTools available to the executing agent:\n");
            for tool in tools {
                system.push_str(&format!(
                    "- {}: {}\n",
                    tool.function.name, tool.function.description
                ));
            }
        }

        let mut messages = vec![Message::system(system)];
        messages.extend(prior.iter().cloned());
        messages.push(Message::user(goal.to_string()));

        let params = ChatParams {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: 0.0,
            tool_choice: ToolChoice::None,
            tag: "plan",
            ..Default::default()
        };

        let response = self.provider.chat(params).await?;
        let text = response
            .content
            .ok_or_else(|| AgentError::Plan("empty planner reply".to_string()))?;

        let json = extract_json(&text)
            .ok_or_else(|| AgentError::Plan(format!("no JSON in planner reply: {}", text)))?;

        let plan: Plan = serde_json::from_str(json)
            .map_err(|e| AgentError::Plan(format!("{}: {}", e, json)))?;

        debug!(steps = plan.steps.len(), "plan parsed");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_prefers_fenced_block() {
        let output = "Sure!\n```json\n{\"reasoning\": \"r\", \"steps\": []}\n```\ndone";
        assert_eq!(extract_json(output), Some("{\"reasoning\": \"r\", \"steps\": []}"));
    }

    #[test]
    fn extract_json_falls_back_to_brace_window() {
        let output = "plan: {\"reasoning\": \"r\", \"steps\": []} thanks";
        assert!(extract_json(output).unwrap().starts_with("{\"reasoning\""));
    }

    #[test]
    fn extract_json_none_without_braces() {
        assert_eq!(extract_json("no structure here"), None);
    }

    #[test]
    fn plan_deserializes_with_optional_fields() {
        let plan: Plan = serde_json::from_str(
            r#"{"reasoning": "two independent lookups",
                "steps": [
                    {"id": 1, "description": "search memory", "tool": "memory_search"},
                    {"id": 2, "description": "read the file", "dependencies": [1]}
                ],
                "task_title": "Config audit"}"#,
        )
        .unwrap();

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool.as_deref(), Some("memory_search"));
        assert_eq!(plan.steps[1].dependencies, vec![1]);
        assert_eq!(plan.task_title.as_deref(), Some("Config audit"));
    }

    #[test]
    fn empty_steps_is_a_valid_plan() {
        let plan: Plan =
            serde_json::from_str(r#"{"reasoning": "just a greeting", "steps": []}"#).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.render_steps(), "");
    }

    #[test]
    fn render_steps_restates_tools_and_dependencies() {
        let plan: Plan = serde_json::from_str(
            r#"{"reasoning": "r", "steps": [
                {"id": 1, "description": "look", "tool": "memory_search"},
                {"id": 2, "description": "act", "dependencies": [1]}
            ]}"#,
        )
        .unwrap();

        let rendered = plan.render_steps();
        assert!(rendered.contains("1. look (tool: memory_search)"));
        assert!(rendered.contains("2. act [after 1]"));
    }
}
