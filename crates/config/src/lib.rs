//! Configuration for engram
//!
//! JSON file at ~/.engram/config.json; every section tolerates being absent.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub mod paths;

pub use paths::{archive_dir, config_path, data_dir, workspace_path};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Credentials and endpoint for one model backend
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// All configured model backends
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendsConfig {
    #[serde(default)]
    pub openrouter: BackendConfig,
    #[serde(default)]
    pub openai: BackendConfig,
}

/// Agent loop defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for memory summarization and relevance selection. Cheap
    /// and fast matters more than clever here.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            model: default_model(),
            summary_model: default_summary_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_turns: default_max_turns(),
        }
    }
}

fn default_workspace() -> String {
    "~/.engram/workspace".to_string()
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

fn default_summary_model() -> String {
    "anthropic/claude-3.5-haiku".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_turns() -> u32 {
    15
}

/// Agent section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

/// Long-term archive section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Override for the records directory; empty means ~/.engram/archive
    #[serde(default)]
    pub dir: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    10
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        debug!("saved config to {:?}", path);
        Ok(())
    }

    /// API key for the first configured backend (openrouter wins)
    pub fn api_key(&self) -> Option<String> {
        if !self.backends.openrouter.api_key.is_empty() {
            return Some(self.backends.openrouter.api_key.clone());
        }
        if !self.backends.openai.api_key.is_empty() {
            return Some(self.backends.openai.api_key.clone());
        }
        None
    }

    /// API base for the backend selected by `api_key`
    pub fn api_base(&self) -> Option<String> {
        if !self.backends.openrouter.api_key.is_empty() {
            return self.backends.openrouter.api_base.clone();
        }
        if !self.backends.openai.api_key.is_empty() {
            return self.backends.openai.api_base.clone();
        }
        None
    }

    pub fn model(&self) -> String {
        self.agent.defaults.model.clone()
    }

    pub fn summary_model(&self) -> String {
        self.agent.defaults.summary_model.clone()
    }

    pub fn max_turns(&self) -> u32 {
        self.agent.defaults.max_turns
    }

    pub fn max_tokens(&self) -> u32 {
        self.agent.defaults.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.agent.defaults.temperature
    }

    /// Workspace path with ~ expanded
    pub fn workspace(&self) -> PathBuf {
        expand_home(&self.agent.defaults.workspace)
    }

    /// Archive directory, falling back to the default location
    pub fn archive_dir(&self) -> PathBuf {
        if self.archive.dir.is_empty() {
            archive_dir()
        } else {
            expand_home(&self.archive.dir)
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
