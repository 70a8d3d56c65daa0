//! Live progress broadcast
//!
//! The agent publishes loop progress here; the CLI (or any other frontend)
//! subscribes to render it. Publishing is fire and forget: no subscriber,
//! no problem.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Buffered events per subscriber before the oldest are dropped
const CHANNEL_CAPACITY: usize = 256;

/// How much of a payload an event carries
const PREVIEW_CHARS: usize = 160;

/// One step of loop progress
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentEvent {
    PlanReady {
        task_title: Option<String>,
        steps: usize,
    },
    TurnStarted {
        turn: u32,
    },
    ToolCall {
        turn: u32,
        name: String,
        preview: String,
    },
    ToolResult {
        turn: u32,
        name: String,
        is_error: bool,
        preview: String,
    },
    Recall {
        query: String,
        found: bool,
    },
    FinalAnswer {
        turns: u32,
        preview: String,
    },
}

/// Event plus when it happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: AgentEvent,
    pub timestamp: DateTime<Local>,
}

/// Clamp text to a preview-sized single line
pub fn preview(text: &str) -> String {
    let one_line = text.replace('\n', " ");
    let mut out: String = one_line.chars().take(PREVIEW_CHARS).collect();
    if one_line.chars().count() > PREVIEW_CHARS {
        out.push('…');
    }
    out
}

/// Broadcast handle; clone freely
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event. Lagging or absent subscribers are not an error.
    pub fn publish(&self, event: AgentEvent) {
        let envelope = Envelope {
            event,
            timestamp: Local::now(),
        };
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains a subscription into tracing; run as a background task
pub struct EventLogger {
    rx: broadcast::Receiver<Envelope>,
}

impl EventLogger {
    pub fn new(rx: broadcast::Receiver<Envelope>) -> Self {
        Self { rx }
    }

    pub async fn run(mut self) {
        debug!("event logger online");

        loop {
            let envelope = match self.rx.recv().await {
                Ok(envelope) => envelope,
                // Fell behind: skip to the oldest retained event
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match &envelope.event {
                AgentEvent::PlanReady { task_title, steps } => {
                    info!(steps, title = ?task_title, "plan ready");
                }
                AgentEvent::TurnStarted { turn } => {
                    debug!(turn, "turn started");
                }
                AgentEvent::ToolCall {
                    turn,
                    name,
                    preview,
                } => {
                    info!(turn, tool = %name, args = %preview, "tool call");
                }
                AgentEvent::ToolResult {
                    turn,
                    name,
                    is_error,
                    preview,
                } => {
                    info!(turn, tool = %name, is_error, result = %preview, "tool result");
                }
                AgentEvent::Recall { query, found } => {
                    debug!(query = %query, found, "memory recall");
                }
                AgentEvent::FinalAnswer { turns, preview } => {
                    info!(turns, answer = %preview, "final answer");
                }
            }
        }

        debug!("event logger offline");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(AgentEvent::TurnStarted { turn: 1 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(AgentEvent::TurnStarted { turn: 1 });
        bus.publish(AgentEvent::ToolCall {
            turn: 1,
            name: "read_file".to_string(),
            preview: "{\"path\":\"notes.md\"}".to_string(),
        });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.event, AgentEvent::TurnStarted { turn: 1 }));

        let second = rx.recv().await.unwrap();
        match second.event {
            AgentEvent::ToolCall { name, .. } => assert_eq!(name, "read_file"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(AgentEvent::FinalAnswer {
            turns: 2,
            preview: "done".to_string(),
        });

        assert!(matches!(
            a.recv().await.unwrap().event,
            AgentEvent::FinalAnswer { turns: 2, .. }
        ));
        assert!(matches!(
            b.recv().await.unwrap().event,
            AgentEvent::FinalAnswer { turns: 2, .. }
        ));
    }

    #[test]
    fn preview_clamps_and_flattens() {
        let long = "line one\nline two ".repeat(40);
        let p = preview(&long);
        assert!(!p.contains('\n'));
        assert!(p.chars().count() <= 161);
        assert!(p.ends_with('…'));

        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = AgentEvent::Recall {
            query: "q".to_string(),
            found: true,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "recall");
        assert_eq!(value["query"], "q");
    }
}
