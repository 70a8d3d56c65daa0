//! Tiered memory for engram
//!
//! Four stores, all keyed by task: the task registry (identity + current
//! pointer), the scratchpad (agent-pinned facts), the running status
//! (done/doing/next/blockers checkpoint) and the memory stream (condensed
//! interaction log with recall). Together they let a bounded-context model
//! work an effectively unbounded task history.

use std::sync::Arc;

use thiserror::Error;

use engram_provider::Provider;

pub mod scratchpad;
pub mod status;
pub mod stream;
pub mod task;

pub use scratchpad::{ScratchpadCommand, ScratchpadEntry, ScratchpadStore};
pub use status::{RunningStatus, StatusBoard, StatusUpdate};
pub use stream::{parse_relevant_ids, MemoryStream, MemoryUnit, Role};
pub use task::{Task, TaskId, TaskRegistry, TaskStatus};

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Everything one agent remembers, owned in one place and passed by
/// reference. Task id is an explicit index into these collections; there is
/// no ambient global state.
pub struct TaskSpace {
    pub tasks: TaskRegistry,
    pub scratchpads: ScratchpadStore,
    pub statuses: StatusBoard,
    pub stream: MemoryStream,
}

impl TaskSpace {
    pub fn new(provider: Arc<dyn Provider>, summary_model: impl Into<String>) -> Self {
        Self {
            tasks: TaskRegistry::new(),
            scratchpads: ScratchpadStore::new(),
            statuses: StatusBoard::new(),
            stream: MemoryStream::new(provider, summary_model),
        }
    }
}
