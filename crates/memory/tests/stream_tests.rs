//! Memory stream behavior against a scripted provider

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use engram_memory::{MemoryStream, Role, TaskId};
use engram_provider::{ChatParams, ChatResponse, Provider, ProviderError};
use serde_json::json;

/// Provider that replays canned replies in order and counts calls.
/// An empty script fails the call, exercising the degraded paths.
struct ScriptedProvider {
    replies: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().map(str::to_string).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, _params: ChatParams) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.lock().unwrap().pop() {
            Some(reply) => Ok(ChatResponse::text(reply)),
            None => Err(ProviderError::Api("script exhausted".to_string())),
        }
    }

    fn default_model(&self) -> String {
        "scripted".to_string()
    }

    fn is_configured(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn short_user_content_is_its_own_summary() {
    let provider = ScriptedProvider::new(vec![]);
    let mut stream = MemoryStream::new(provider.clone(), "m");

    let unit = stream.record_user("find my config", 0, TaskId(0)).await;
    assert_eq!(unit.summary, "find my config");
    assert_eq!(unit.content, "find my config");
    assert_eq!(unit.role, Role::User);
    // Verbatim path must not touch the model
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn long_user_content_gets_model_summary() {
    let provider = ScriptedProvider::new(vec!["User asks for a config audit."]);
    let mut stream = MemoryStream::new(provider.clone(), "m");

    let long = "please audit every config file in the repository and ".repeat(5);
    let unit = stream.record_user(long.clone(), 0, TaskId(0)).await;
    assert_eq!(unit.summary, "User asks for a config audit.");
    assert_eq!(unit.content, long);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn tool_records_always_summarize_and_keep_metadata() {
    let provider = ScriptedProvider::new(vec!["Read /etc/app.toml, 500 lines."]);
    let mut stream = MemoryStream::new(provider.clone(), "m");

    let unit = stream
        .record_tool(
            "read_file",
            &json!({"path": "/etc/app.toml"}),
            "line 1\nline 2",
            2,
            TaskId(0),
            Some(7),
        )
        .await;

    assert_eq!(unit.role, Role::Tool);
    assert_eq!(unit.tool_name.as_deref(), Some("read_file"));
    assert!(unit.tool_args.as_deref().unwrap().contains("/etc/app.toml"));
    assert_eq!(unit.related_id, Some(7));
    assert_eq!(unit.summary, "Read /etc/app.toml, 500 lines.");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn failed_summary_degrades_to_truncated_content() {
    let provider = ScriptedProvider::new(vec![]);
    let mut stream = MemoryStream::new(provider, "m");

    let unit = stream
        .record_assistant("assistant text that matters", 1, TaskId(0))
        .await;
    assert!(unit.summary.contains("assistant text that matters"));
}

#[tokio::test]
async fn units_are_insertion_ordered_with_nondecreasing_turns() {
    let provider = ScriptedProvider::new(vec!["s1", "s2", "s3"]);
    let mut stream = MemoryStream::new(provider, "m");
    let task = TaskId(0);

    stream.record_user("turn zero", 0, task).await;
    stream
        .record_tool("exec", &json!({"command": "ls"}), "out", 1, task, None)
        .await;
    stream.record_assistant("done with one", 1, task).await;
    stream.record_user("another", 2, task).await;

    let units: Vec<_> = stream.units_for(task).collect();
    assert_eq!(units.len(), 4);
    for pair in units.windows(2) {
        assert!(pair[0].id < pair[1].id);
        assert!(pair[0].turn_id <= pair[1].turn_id);
    }
}

#[tokio::test]
async fn retrieve_on_empty_task_is_empty_without_model_call() {
    let provider = ScriptedProvider::new(vec![]);
    let stream = MemoryStream::new(provider.clone(), "m");

    assert_eq!(stream.retrieve("anything", TaskId(0)).await, "");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn retrieve_hydrates_selected_units_in_full() {
    let provider = ScriptedProvider::new(vec![
        "Tool read_file returned the full config.",
        r#"{"relevant_ids": [1]}"#,
    ]);
    let mut stream = MemoryStream::new(provider, "m");
    let task = TaskId(0);

    stream.record_user("read the config", 0, task).await;
    let big_output = (1..=500)
        .map(|i| format!("config line {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    let unit = stream
        .record_tool(
            "read_file",
            &json!({"path": "app.toml"}),
            big_output.clone(),
            1,
            task,
            None,
        )
        .await;
    assert_eq!(unit.id, 1);

    let recalled = stream.retrieve("what was in the config?", task).await;
    // Full content, not the summary
    assert!(recalled.contains("config line 1"));
    assert!(recalled.contains("config line 500"));
    assert!(recalled.contains("[memory 1 | tool turn 1]"));
}

#[tokio::test]
async fn retrieve_never_exceeds_selected_id_count() {
    let provider = ScriptedProvider::new(vec![r#"{"relevant_ids": [0]}"#]);
    let mut stream = MemoryStream::new(provider, "m");
    let task = TaskId(0);

    stream.record_user("a", 0, task).await;
    stream.record_user("b", 1, task).await;
    stream.record_user("c", 2, task).await;

    let recalled = stream.retrieve("q", task).await;
    assert_eq!(recalled.matches("[end memory").count(), 1);
}

#[tokio::test]
async fn retrieve_drops_unresolvable_ids_silently() {
    let provider = ScriptedProvider::new(vec![r#"{"relevant_ids": [0, 404]}"#]);
    let mut stream = MemoryStream::new(provider, "m");
    let task = TaskId(0);

    stream.record_user("real", 0, task).await;

    let recalled = stream.retrieve("q", task).await;
    assert!(recalled.contains("[memory 0"));
    assert!(!recalled.contains("404"));
}

#[tokio::test]
async fn retrieve_degrades_to_empty_on_selector_garbage() {
    let provider = ScriptedProvider::new(vec!["I think records one and two."]);
    let mut stream = MemoryStream::new(provider, "m");
    let task = TaskId(0);
    stream.record_user("something", 0, task).await;

    assert_eq!(stream.retrieve("q", task).await, "");
}

#[tokio::test]
async fn retrieve_degrades_to_empty_on_provider_failure() {
    let provider = ScriptedProvider::new(vec![]);
    let mut stream = MemoryStream::new(provider, "m");
    let task = TaskId(0);
    stream.record_user("something", 0, task).await;

    assert_eq!(stream.retrieve("q", task).await, "");
}

#[tokio::test]
async fn streams_are_task_scoped() {
    let provider = ScriptedProvider::new(vec![r#"{"relevant_ids": [1]}"#]);
    let mut stream = MemoryStream::new(provider, "m");

    stream.record_user("task zero fact", 0, TaskId(0)).await;
    stream.record_user("task one fact", 0, TaskId(1)).await;

    assert_eq!(stream.units_for(TaskId(0)).count(), 1);
    assert_eq!(stream.units_for(TaskId(1)).count(), 1);

    let recalled = stream.retrieve("fact", TaskId(1)).await;
    assert!(recalled.contains("task one fact"));
    assert!(!recalled.contains("task zero fact"));
}
