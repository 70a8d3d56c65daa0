//! Built-in tools: the scratchpad and the running-status checkpoint
//!
//! Both mutate the task space directly and hand their refreshed rendered
//! view back as the tool result. Validation failures become error text for
//! the model, never a crash.

use serde_json::{json, Value};

use engram_memory::{ScratchpadCommand, StatusUpdate, TaskId, TaskSpace};
use engram_provider::Tool;

pub const SCRATCHPAD_TOOL: &str = "manage_scratchpad";
pub const STATUS_TOOL: &str = "update_running_summary";

pub fn is_builtin(name: &str) -> bool {
    name == SCRATCHPAD_TOOL || name == STATUS_TOOL
}

/// Model-facing definitions for both built-ins
pub fn definitions() -> Vec<Tool> {
    vec![
        Tool::new(
            SCRATCHPAD_TOOL,
            "Pin a fact to the task scratchpad or remove one. Pinned facts \
             stay visible in every later prompt; delete keys you no longer \
             need.",
            json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["update", "delete"],
                        "description": "update upserts the key; delete removes it"
                    },
                    "key": { "type": "string", "description": "Entry name" },
                    "value": {
                        "type": "string",
                        "description": "Entry content; required for update"
                    }
                },
                "required": ["action", "key"]
            }),
        ),
        Tool::new(
            STATUS_TOOL,
            "Checkpoint your progress: what is done, what you are doing, \
             what comes next, and any blockers. Resend the complete done \
             list each time; it replaces the stored one.",
            json!({
                "type": "object",
                "properties": {
                    "done": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Complete list of finished items"
                    },
                    "doing": { "type": "string", "description": "Current activity" },
                    "next": { "type": "string", "description": "Planned next step" },
                    "blockers": { "type": "string", "description": "Anything in the way" }
                },
                "required": ["doing", "next"]
            }),
        ),
    ]
}

/// Execute one built-in call. Ok carries the refreshed rendered view; Err
/// carries error text destined for an error-kind tool result.
pub fn dispatch(
    space: &mut TaskSpace,
    task_id: TaskId,
    name: &str,
    args: &Value,
) -> std::result::Result<String, String> {
    match name {
        SCRATCHPAD_TOOL => {
            let command: ScratchpadCommand = serde_json::from_value(args.clone())
                .map_err(|e| format!("bad arguments: {}", e))?;
            space
                .scratchpads
                .apply(task_id, &command)
                .map_err(|e| e.to_string())
        }
        STATUS_TOOL => {
            let update: StatusUpdate = serde_json::from_value(args.clone())
                .map_err(|e| format!("bad arguments: {}", e))?;
            Ok(space.statuses.update(task_id, update))
        }
        other => Err(format!("not a built-in tool: {}", other)),
    }
}
