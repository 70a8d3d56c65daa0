//! Running status: the done/doing/next/blockers checkpoint
//!
//! This tiny block is what lets a multi-step plan survive the per-turn
//! prompt rebuild. It is deliberately separate from the high-volume
//! memory stream.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::TaskId;

#[derive(Debug, Clone)]
pub struct RunningStatus {
    pub done: Vec<String>,
    pub doing: String,
    pub next: String,
    pub blockers: Option<String>,
    pub timestamp: DateTime<Local>,
}

/// Wire shape of `update_running_summary`. `doing` and `next` are required;
/// a payload without them fails argument parsing upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub done: Option<Vec<String>>,
    pub doing: String,
    pub next: String,
    #[serde(default)]
    pub blockers: Option<String>,
}

/// Per-task checkpoints
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: HashMap<TaskId, RunningStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an update and return the refreshed rendered view.
    ///
    /// `doing`, `next` and `blockers` are overwritten unconditionally (an
    /// absent `blockers` clears it). `done` is replaced wholesale with the
    /// supplied array; when absent the previous list stays. The tool
    /// description tells the model to resend the complete list.
    pub fn update(&mut self, task_id: TaskId, update: StatusUpdate) -> String {
        let previous_done = self
            .statuses
            .get(&task_id)
            .map(|s| s.done.clone())
            .unwrap_or_default();

        self.statuses.insert(
            task_id,
            RunningStatus {
                done: update.done.unwrap_or(previous_done),
                doing: update.doing,
                next: update.next,
                blockers: update.blockers,
                timestamp: Local::now(),
            },
        );

        self.render(task_id)
    }

    /// Fixed-format block, or "" when no status exists yet
    pub fn render(&self, task_id: TaskId) -> String {
        let status = match self.statuses.get(&task_id) {
            Some(status) => status,
            None => return String::new(),
        };

        let mut out = String::from("Running status:\n");
        if status.done.is_empty() {
            out.push_str("Done: (nothing yet)\n");
        } else {
            out.push_str("Done:\n");
            for item in &status.done {
                out.push_str(&format!("- {}\n", item));
            }
        }
        out.push_str(&format!("Doing: {}\n", status.doing));
        out.push_str(&format!("Next: {}\n", status.next));
        if let Some(blockers) = &status.blockers {
            out.push_str(&format!("Blockers: {}\n", blockers));
        }
        out
    }

    pub fn get(&self, task_id: TaskId) -> Option<&RunningStatus> {
        self.statuses.get(&task_id)
    }
}
