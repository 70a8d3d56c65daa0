//! Task registry: identity plus the "current task" pointer
//!
//! Every other store is keyed by TaskId. The registry is an arena; ids are
//! plain indexes and never dangle because tasks are never deleted.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Index handle into the task arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
    Paused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Local>,
}

/// Arena of tasks plus the single mutable "current" pointer
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    current: Option<TaskId>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a task, mark it active and current
    pub fn create(&mut self, title: impl Into<String>) -> TaskId {
        let id = TaskId(self.tasks.len() as u64);
        self.tasks.push(Task {
            id,
            title: title.into(),
            status: TaskStatus::Active,
            created_at: Local::now(),
        });
        self.current = Some(id);
        debug!(%id, "task created");
        id
    }

    /// Move the current pointer; false (and no change) on an unknown id
    pub fn switch_to(&mut self, id: TaskId) -> bool {
        if self.get(id).is_some() {
            self.current = Some(id);
            true
        } else {
            debug!(%id, "switch to unknown task ignored");
            false
        }
    }

    /// Current task id, lazily creating "Default Task" so every store
    /// always has a valid scope key
    pub fn current_id(&mut self) -> TaskId {
        match self.current {
            Some(id) => id,
            None => self.create("Default Task"),
        }
    }

    /// Rename a task once intent is clear; false on an unknown id
    pub fn retitle(&mut self, id: TaskId, title: impl Into<String>) -> bool {
        match self.tasks.get_mut(id.0 as usize) {
            Some(task) => {
                task.title = title.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
