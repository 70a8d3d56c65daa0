//! The control loop
//!
//! One `chat` call runs PLANNING, then up to MAX_TURNS turns. Each turn
//! rebuilds the prompt from scratch, calls the model with the full tool
//! set, executes any requested calls strictly in issued order, folds the
//! results back into memory, and re-seeds the focus query from what the
//! tools just produced. A tool-call-free reply ends the loop; an exhausted
//! cap degrades to the last assistant text instead of erroring.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use engram_bus::{preview, AgentEvent, EventBus};
use engram_memory::{TaskId, TaskSpace};
use engram_provider::{
    ChatParams, ChatResponse, Message, Provider, ToolCall, ToolCallDef, ToolChoice, ToolError,
};

use crate::planner::{Plan, Planner};
use crate::registry::ProviderRegistry;
use crate::{builtin, prompt, retrieval, Result};

/// Hard cap on turns per chat call
pub const MAX_TURNS: u32 = 15;

/// What a model reply means for the loop
#[derive(Debug)]
pub enum TurnOutcome {
    FinalAnswer(String),
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
}

impl From<ChatResponse> for TurnOutcome {
    fn from(response: ChatResponse) -> Self {
        if response.has_tool_calls() {
            TurnOutcome::ToolCalls {
                text: response.content,
                calls: response.tool_calls,
            }
        } else {
            TurnOutcome::FinalAnswer(response.content.unwrap_or_default())
        }
    }
}

/// Loop tuning, normally taken from config
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub summary_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_turns: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-sonnet-4".to_string(),
            summary_model: "anthropic/claude-3.5-haiku".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            max_turns: MAX_TURNS,
        }
    }
}

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    planner: Planner,
    space: TaskSpace,
    registry: ProviderRegistry,
    bus: EventBus,
    settings: LoopSettings,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: ProviderRegistry,
        bus: EventBus,
        settings: LoopSettings,
    ) -> Self {
        let mut settings = settings;
        settings.max_turns = settings.max_turns.clamp(1, MAX_TURNS);

        let planner = Planner::new(provider.clone(), settings.model.clone(), settings.max_tokens);
        let space = TaskSpace::new(provider.clone(), settings.summary_model.clone());

        Self {
            provider,
            planner,
            space,
            registry,
            bus,
            settings,
        }
    }

    /// The agent's memory, for inspection and task management
    pub fn space(&self) -> &TaskSpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut TaskSpace {
        &mut self.space
    }

    /// Run one full request to a final answer.
    ///
    /// Model transport failures inside the turn loop propagate; everything
    /// else degrades (failed planning, failed recall, failed tool calls).
    pub async fn chat(&mut self, user_input: &str) -> Result<String> {
        let task_id = self.space.tasks.current_id();

        let plan = self.run_planning(user_input, task_id).await;

        // Best-effort record of the raw request; summarization failures
        // already degrade inside the stream
        let user_unit = self.space.stream.record_user(user_input, 0, task_id).await;

        let mut focus_query = user_input.to_string();
        let mut prev_turn: Vec<Message> = Vec::new();
        let mut last_text = String::new();

        for turn in 1..=self.settings.max_turns {
            self.bus.publish(AgentEvent::TurnStarted { turn });

            let recall = self.space.stream.retrieve(&focus_query, task_id).await;
            self.bus.publish(AgentEvent::Recall {
                query: focus_query.clone(),
                found: !recall.is_empty(),
            });

            let messages = prompt::build_turn_messages(
                plan.as_ref(),
                &self.space.scratchpads.render(task_id),
                &self.space.statuses.render(task_id),
                &recall,
                user_input,
                &prev_turn,
            );

            let mut tools = self.registry.definitions();
            tools.extend(builtin::definitions());

            let params = ChatParams {
                model: self.settings.model.clone(),
                messages,
                tools,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                tool_choice: ToolChoice::Auto,
                tag: "turn",
            };

            let response = self.provider.chat(params).await?;

            match TurnOutcome::from(response) {
                TurnOutcome::FinalAnswer(text) => {
                    self.space.stream.record_assistant(&text, turn, task_id).await;
                    self.bus.publish(AgentEvent::FinalAnswer {
                        turns: turn,
                        preview: preview(&text),
                    });
                    return Ok(text);
                }
                TurnOutcome::ToolCalls { text, calls } => {
                    if let Some(text) = &text {
                        if !text.is_empty() {
                            last_text = text.clone();
                        }
                    }

                    let call_defs: Vec<ToolCallDef> = calls
                        .iter()
                        .map(|c| ToolCallDef::new(&c.id, &c.name, c.arguments.clone()))
                        .collect();
                    let mut turn_messages =
                        vec![Message::assistant_with_calls(text, call_defs)];
                    let mut digests: Vec<String> = Vec::new();

                    // Strictly in issued order; later calls may depend on
                    // state the earlier ones just mutated
                    for call in &calls {
                        self.bus.publish(AgentEvent::ToolCall {
                            turn,
                            name: call.name.clone(),
                            preview: preview(&call.arguments.to_string()),
                        });

                        let (result_text, is_error) =
                            self.dispatch(task_id, call, &focus_query).await;

                        self.bus.publish(AgentEvent::ToolResult {
                            turn,
                            name: call.name.clone(),
                            is_error,
                            preview: preview(&result_text),
                        });

                        let unit = self
                            .space
                            .stream
                            .record_tool(
                                &call.name,
                                &call.arguments,
                                &result_text,
                                turn,
                                task_id,
                                Some(user_unit.id),
                            )
                            .await;
                        digests.push(unit.summary.clone());

                        turn_messages.push(Message::tool(&call.id, &call.name, &result_text));
                    }

                    // Retrieval should track what was just discovered, not
                    // only the original request
                    if !digests.is_empty() {
                        focus_query = digests.join("; ");
                    }
                    prev_turn = turn_messages;
                }
            }
        }

        warn!(
            turns = self.settings.max_turns,
            "turn cap reached without a final reply"
        );
        self.bus.publish(AgentEvent::FinalAnswer {
            turns: self.settings.max_turns,
            preview: preview(&last_text),
        });
        Ok(last_text)
    }

    /// PLANNING phase: advisory, never aborts the call
    async fn run_planning(&mut self, user_input: &str, task_id: TaskId) -> Option<Plan> {
        let recall = self.space.stream.retrieve(user_input, task_id).await;
        let prior = prompt::planning_context(&recall);

        let mut tools = self.registry.definitions();
        tools.extend(builtin::definitions());

        match self.planner.plan(user_input, &prior, &tools).await {
            Ok(plan) => {
                if let Some(title) = &plan.task_title {
                    self.space.tasks.retitle(task_id, title.clone());
                }
                self.bus.publish(AgentEvent::PlanReady {
                    task_title: plan.task_title.clone(),
                    steps: plan.steps.len(),
                });
                Some(plan)
            }
            Err(e) => {
                warn!("planning failed, proceeding without a plan: {}", e);
                None
            }
        }
    }

    /// Execute one tool call. Never fails: every failure mode becomes an
    /// error-kind result string for the model to react to next turn.
    async fn dispatch(&mut self, task_id: TaskId, call: &ToolCall, query: &str) -> (String, bool) {
        // The transport hands unparsable argument payloads through as a raw
        // string; that is this call's parse failure, not the turn's
        let args = match &call.arguments {
            Value::Object(_) => call.arguments.clone(),
            Value::Null => json!({}),
            other => {
                return (
                    format!("Error: arguments did not parse as a JSON object: {}", other),
                    true,
                );
            }
        };

        if builtin::is_builtin(&call.name) {
            return match builtin::dispatch(&mut self.space, task_id, &call.name, &args) {
                Ok(view) => (view, false),
                Err(e) => (format!("Error: {}", e), true),
            };
        }

        if call.name == "memory_search" {
            // Two-stage pipeline: raw summaries are never injected directly
            return match self.registry.call(&call.name, args.clone()).await {
                Ok(content) => {
                    let search_query = args["query"].as_str().unwrap_or(query);
                    let refined = retrieval::refine(
                        &self.provider,
                        &self.settings.summary_model,
                        &self.registry,
                        search_query,
                        &content.joined(),
                    )
                    .await;
                    (refined, false)
                }
                Err(e) => (format!("Error: {}", e), true),
            };
        }

        match self.registry.call(&call.name, args).await {
            Ok(content) => (content.joined(), false),
            Err(ToolError::Unknown(name)) => {
                debug!(tool = %name, "unregistered tool requested");
                (format!("Error: unknown tool: {}", name), true)
            }
            Err(ToolError::Execution(e)) => (format!("Error: {}", e), true),
        }
    }
}
