//! Per-turn prompt assembly
//!
//! The prompt is rebuilt from scratch every turn; it is never a growing
//! transcript. What survives between turns lives in the plan, the progress
//! panel, the memory stream and one prior turn of raw messages.

use engram_provider::Message;

use crate::planner::Plan;

const SYSTEM_PROMPT: &str = "You are engram, a tool-using assistant with \
tiered memory.

Work the user's request step by step. Use tools when they help; reply with \
plain text once the request is fully answered.

Your context is rebuilt every turn. Anything not pinned below will be gone \
next turn, so:
- Pin facts you will need later (paths, ids, decisions) with \
manage_scratchpad.
- Checkpoint multi-step work with update_running_summary so you never redo \
a finished step.
- Past details are recalled for you automatically; memory_search reaches \
older, long-term records.";

/// Assemble the planning-only message list: system instructions plus
/// best-effort recall context. The planner appends the goal itself.
pub fn planning_context(recall: &str) -> Vec<Message> {
    if recall.is_empty() {
        Vec::new()
    } else {
        vec![Message::user(format!(
            "Possibly relevant memory:\n{}",
            recall
        ))]
    }
}

/// Build one turn's messages from scratch
pub fn build_turn_messages(
    plan: Option<&Plan>,
    scratchpad: &str,
    status: &str,
    recall: &str,
    user_input: &str,
    prev_turn: &[Message],
) -> Vec<Message> {
    let mut sections = vec![SYSTEM_PROMPT.to_string()];

    if let Some(plan) = plan {
        if !plan.is_empty() {
            sections.push(format!("Plan for this request:\n{}", plan.render_steps()));
        }
    }

    let mut panel = String::new();
    if !scratchpad.is_empty() {
        panel.push_str(scratchpad);
    }
    if !status.is_empty() {
        if !panel.is_empty() {
            panel.push('\n');
        }
        panel.push_str(status);
    }
    if !panel.is_empty() {
        sections.push(format!("Progress panel:\n{}", panel));
    }

    if !recall.is_empty() {
        sections.push(format!("Recalled from memory:\n{}", recall));
    }

    let mut messages = vec![Message::system(sections.join("\n\n---\n\n"))];
    messages.push(Message::user(format!("User request: {}", user_input)));
    messages.extend(prev_turn.iter().cloned());
    messages
}
