//! Disk round-trip tests for engram-config

use engram_config::Config;
use tempfile::TempDir;

#[tokio::test]
async fn load_from_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let config = Config::load_from(&path).await.unwrap();
    assert_eq!(config.max_turns(), 15);
    assert!(config.api_key().is_none());
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.backends.openrouter.api_key = "sk-or-roundtrip".to_string();
    config.agent.defaults.model = "test/model".to_string();
    config.archive.search_limit = 3;
    config.save_to(&path).await.unwrap();

    let loaded = Config::load_from(&path).await.unwrap();
    assert_eq!(loaded.api_key(), Some("sk-or-roundtrip".to_string()));
    assert_eq!(loaded.model(), "test/model");
    assert_eq!(loaded.archive.search_limit, 3);
}

#[tokio::test]
async fn malformed_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, "{not json").await.unwrap();

    assert!(Config::load_from(&path).await.is_err());
}

#[tokio::test]
async fn unknown_sections_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, r#"{"future_section": {"x": 1}}"#)
        .await
        .unwrap();

    let config = Config::load_from(&path).await.unwrap();
    assert_eq!(config.max_turns(), 15);
}
