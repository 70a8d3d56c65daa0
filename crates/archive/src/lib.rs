//! Long-term archive: durable memories that outlive the process
//!
//! One JSON file per record, found again by linear scan. No index, no
//! ranking; relevance judgment is the model's job downstream.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod provider;

pub use provider::ArchiveProvider;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// One archived memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content: String,
    pub created_at: DateTime<Local>,
}

impl ArchiveRecord {
    /// Summary view returned by search: everything except the content
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "tags": self.tags,
        })
    }
}

/// Directory of JSON records with linear-scan lookup
pub struct Archive {
    dir: PathBuf,
    search_limit: usize,
}

impl Archive {
    pub fn new(dir: impl AsRef<Path>, search_limit: usize) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            search_limit,
        }
    }

    /// Append a record; allocates the id
    pub async fn save(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: Vec<String>,
        content: impl Into<String>,
    ) -> Result<ArchiveRecord> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let record = ArchiveRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            tags,
            content: content.into(),
            created_at: Local::now(),
        };

        let path = self.record_path(&record.id);
        let payload = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(&path, payload).await?;
        debug!(id = %record.id, "archive record saved");
        Ok(record)
    }

    /// Fetch one record by id
    pub async fn get(&self, id: &str) -> Result<Option<ArchiveRecord>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Linear scan: a record matches when any whitespace-separated query
    /// token appears (case-insensitive) in its name, description or tags.
    /// Results come back in directory order, capped at the search limit.
    pub async fn search(&self, query: &str) -> Result<Vec<ArchiveRecord>> {
        let tokens: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut matches = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // No archive yet: nothing matches
            Err(_) => return Ok(matches),
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if matches.len() >= self.search_limit {
                break;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record: ArchiveRecord = match tokio::fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("skipping malformed record {:?}: {}", path, e);
                        continue;
                    }
                },
                Err(e) => {
                    warn!("skipping unreadable record {:?}: {}", path, e);
                    continue;
                }
            };

            if tokens.is_empty() || record_matches(&record, &tokens) {
                matches.push(record);
            }
        }

        Ok(matches)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        let safe: String = id
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                _ => c,
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

fn record_matches(record: &ArchiveRecord, tokens: &[String]) -> bool {
    let haystack = format!(
        "{} {} {}",
        record.name,
        record.description,
        record.tags.join(" ")
    )
    .to_lowercase();

    tokens.iter().any(|t| haystack.contains(t))
}
