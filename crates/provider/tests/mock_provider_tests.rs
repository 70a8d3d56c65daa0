//! Mockall-based tests for the Provider trait seam

use async_trait::async_trait;
use engram_provider::{
    ChatParams, ChatResponse, Message, Provider, ProviderError, ToolCall, Usage,
};
use mockall::mock;
use serde_json::json;

mock! {
    pub Backend {}

    #[async_trait]
    impl Provider for Backend {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

#[tokio::test]
async fn mock_returns_text() {
    let mut mock = MockBackend::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("hello")));

    let response = mock.chat(ChatParams::default()).await.unwrap();
    assert_eq!(response.content, Some("hello".to_string()));
    assert!(!response.has_tool_calls());
}

#[tokio::test]
async fn mock_returns_api_error() {
    let mut mock = MockBackend::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::Api("backend down".to_string())));

    let result = mock.chat(ChatParams::default()).await;
    match result {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "backend down"),
        other => panic!("expected Api error, got {:?}", other.map(|r| r.content)),
    }
}

#[tokio::test]
async fn mock_returns_tool_calls() {
    let mut mock = MockBackend::new();
    mock.expect_chat().times(1).returning(|_| {
        Ok(ChatResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "memory_search".to_string(),
                arguments: json!({"query": "config path"}),
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        })
    });

    let response = mock.chat(ChatParams::default()).await.unwrap();
    assert!(response.has_tool_calls());
    assert_eq!(response.tool_calls[0].name, "memory_search");
}

#[tokio::test]
async fn mock_sees_request_messages() {
    let mut mock = MockBackend::new();
    mock.expect_chat()
        .withf(|params: &ChatParams| {
            params.messages.len() == 2 && params.messages[0].role == "system"
        })
        .times(1)
        .returning(|_| Ok(ChatResponse::text("ok")));

    let params = ChatParams {
        messages: vec![Message::system("sys"), Message::user("hi")],
        ..Default::default()
    };
    mock.chat(params).await.unwrap();
}

#[test]
fn mock_reports_configuration() {
    let mut mock = MockBackend::new();
    mock.expect_is_configured().return_const(true);
    mock.expect_default_model()
        .return_const("anthropic/claude-sonnet-4".to_string());

    assert!(mock.is_configured());
    assert_eq!(mock.default_model(), "anthropic/claude-sonnet-4");
}
