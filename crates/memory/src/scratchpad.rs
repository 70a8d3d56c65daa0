//! Scratchpad: agent-pinned key/value notes, one bulletin per task
//!
//! Upsert-or-delete only. Nothing expires; the agent shrinks the pad by
//! deleting keys it no longer needs.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::{MemoryError, Result, TaskId};

#[derive(Debug, Clone)]
pub struct ScratchpadEntry {
    pub key: String,
    pub value: String,
    pub timestamp: DateTime<Local>,
}

/// Wire shape of the `manage_scratchpad` tool arguments. Fields are all
/// optional so validation errors surface as tool results, not parse errors.
#[derive(Debug, Clone, Deserialize)]
pub struct ScratchpadCommand {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Per-task bulletins, insertion-ordered
#[derive(Debug, Default)]
pub struct ScratchpadStore {
    pads: HashMap<TaskId, Vec<ScratchpadEntry>>,
}

impl ScratchpadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and apply a command, returning the refreshed rendered view
    pub fn apply(&mut self, task_id: TaskId, command: &ScratchpadCommand) -> Result<String> {
        let key = match command.key.as_deref() {
            Some(k) if !k.trim().is_empty() => k.trim().to_string(),
            _ => return Err(MemoryError::InvalidCommand("missing key".to_string())),
        };

        match command.action.as_deref() {
            Some("update") => {
                let value = command.value.clone().ok_or_else(|| {
                    MemoryError::InvalidCommand("update requires a value".to_string())
                })?;
                self.update(task_id, key, value);
            }
            Some("delete") => {
                self.delete(task_id, &key);
            }
            other => {
                return Err(MemoryError::InvalidCommand(format!(
                    "unknown action {:?}, expected \"update\" or \"delete\"",
                    other.unwrap_or("")
                )));
            }
        }

        Ok(self.render(task_id))
    }

    /// Upsert with a fresh timestamp; an existing key keeps its position
    pub fn update(&mut self, task_id: TaskId, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let pad = self.pads.entry(task_id).or_default();
        match pad.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.value = value.into();
                entry.timestamp = Local::now();
            }
            None => pad.push(ScratchpadEntry {
                key,
                value: value.into(),
                timestamp: Local::now(),
            }),
        }
    }

    /// Remove a key; false when it was not present
    pub fn delete(&mut self, task_id: TaskId, key: &str) -> bool {
        match self.pads.get_mut(&task_id) {
            Some(pad) => {
                let before = pad.len();
                pad.retain(|e| e.key != key);
                pad.len() != before
            }
            None => false,
        }
    }

    /// Fixed-format bulletin in insertion order, or "" when empty
    pub fn render(&self, task_id: TaskId) -> String {
        let pad = match self.pads.get(&task_id) {
            Some(pad) if !pad.is_empty() => pad,
            _ => return String::new(),
        };

        let mut out = String::from("Scratchpad:\n");
        for entry in pad {
            out.push_str(&format!("- {}: {}\n", entry.key, entry.value));
        }
        out
    }

    pub fn entries(&self, task_id: TaskId) -> &[ScratchpadEntry] {
        self.pads.get(&task_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
