//! Workspace provider: file operations and command execution
//!
//! Everything is rooted in the workspace directory; paths that resolve
//! outside it are rejected. Expected failures (missing file, non-zero
//! exit) come back as tool text the model can react to.

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use engram_provider::{ToolContent, ToolError, ToolProvider, ToolSpec};

const MAX_OUTPUT_BYTES: usize = 10_000;

pub struct WorkspaceProvider {
    workspace: PathBuf,
}

impl WorkspaceProvider {
    pub fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }

    /// Resolve a tool-supplied path inside the workspace. Absolute paths
    /// must already live under the workspace; relative paths are joined to
    /// it; `..` components are rejected outright.
    fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let candidate = Path::new(path);
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ToolError::Execution(format!(
                "path {} escapes the workspace",
                path
            )));
        }

        let resolved = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.workspace.join(candidate)
        };

        if !resolved.starts_with(&self.workspace) {
            return Err(ToolError::Execution(format!(
                "path {} is outside the workspace {}",
                path,
                self.workspace.display()
            )));
        }
        Ok(resolved)
    }
}

#[derive(Deserialize)]
struct ReadArgs {
    path: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Deserialize)]
struct ExecArgs {
    command: String,
}

#[async_trait]
impl ToolProvider for WorkspaceProvider {
    fn list_tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "read_file",
                "Read a file from the workspace.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Path relative to the workspace" }
                    },
                    "required": ["path"]
                }),
            ),
            ToolSpec::new(
                "write_file",
                "Write a file in the workspace, creating directories as needed.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Path relative to the workspace" },
                        "content": { "type": "string", "description": "File content" }
                    },
                    "required": ["path", "content"]
                }),
            ),
            ToolSpec::new(
                "list_dir",
                "List a workspace directory.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Directory, defaults to the workspace root" }
                    }
                }),
            ),
            ToolSpec::new(
                "exec",
                "Run a shell command in the workspace. Use with care.",
                json!({
                    "type": "object",
                    "properties": {
                        "command": { "type": "string", "description": "Shell command" }
                    },
                    "required": ["command"]
                }),
            ),
        ]
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<ToolContent, ToolError> {
        match name {
            "read_file" => {
                let args: ReadArgs = parse_args(args)?;
                let path = self.resolve(&args.path)?;
                debug!(path = %path.display(), "reading file");
                if !path.is_file() {
                    return Ok(ToolContent::text(format!("no file at {}", args.path)));
                }
                match tokio::fs::read_to_string(&path).await {
                    Ok(content) => Ok(ToolContent::text(content)),
                    Err(e) => Ok(ToolContent::text(format!("read failed: {}", e))),
                }
            }
            "write_file" => {
                let args: WriteArgs = parse_args(args)?;
                let path = self.resolve(&args.path)?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| ToolError::Execution(e.to_string()))?;
                }
                match tokio::fs::write(&path, &args.content).await {
                    Ok(()) => Ok(ToolContent::text(format!(
                        "wrote {} bytes to {}",
                        args.content.len(),
                        args.path
                    ))),
                    Err(e) => Ok(ToolContent::text(format!("write failed: {}", e))),
                }
            }
            "list_dir" => {
                let args: ListArgs = parse_args(args)?;
                let path = self.resolve(args.path.as_deref().unwrap_or("."))?;
                let mut entries = match tokio::fs::read_dir(&path).await {
                    Ok(entries) => entries,
                    Err(e) => return Ok(ToolContent::text(format!("list failed: {}", e))),
                };

                let mut names = Vec::new();
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let suffix = if entry.path().is_dir() { "/" } else { "" };
                    names.push(format!("{}{}", entry.file_name().to_string_lossy(), suffix));
                }
                names.sort();
                if names.is_empty() {
                    Ok(ToolContent::text("(empty)"))
                } else {
                    Ok(ToolContent::text(names.join("\n")))
                }
            }
            "exec" => {
                let args: ExecArgs = parse_args(args)?;
                debug!(command = %args.command, "executing");

                let output = Command::new("sh")
                    .arg("-c")
                    .arg(&args.command)
                    .current_dir(&self.workspace)
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await
                    .map_err(|e| ToolError::Execution(e.to_string()))?;

                let mut parts = Vec::new();
                if !output.stdout.is_empty() {
                    parts.push(String::from_utf8_lossy(&output.stdout).to_string());
                }
                if !output.stderr.is_empty() {
                    parts.push(format!(
                        "STDERR:\n{}",
                        String::from_utf8_lossy(&output.stderr)
                    ));
                }
                if output.status.code() != Some(0) {
                    parts.push(format!("exit code: {}", output.status.code().unwrap_or(-1)));
                }

                let mut text = if parts.is_empty() {
                    "(no output)".to_string()
                } else {
                    parts.join("\n")
                };
                if text.len() > MAX_OUTPUT_BYTES {
                    let cut = floor_char_boundary(&text, MAX_OUTPUT_BYTES);
                    text.truncate(cut);
                    text.push_str("\n(output truncated)");
                }
                Ok(ToolContent::text(text))
            }
            other => Err(ToolError::Unknown(other.to_string())),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::Execution(format!("bad arguments: {}", e)))
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn provider(dir: &TempDir) -> WorkspaceProvider {
        WorkspaceProvider::new(dir.path().to_path_buf())
    }

    #[test]
    fn resolve_rejects_traversal_and_escapes() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        assert!(provider.resolve("../secret.txt").is_err());
        assert!(provider.resolve("a/../../b").is_err());
        assert!(provider.resolve("/etc/passwd").is_err());
        assert!(provider.resolve("notes/today.md").is_ok());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        let written = provider
            .call_tool(
                "write_file",
                json!({"path": "notes/today.md", "content": "remember this"}),
            )
            .await
            .unwrap();
        assert!(written.joined().contains("13 bytes"));

        let read = provider
            .call_tool("read_file", json!({"path": "notes/today.md"}))
            .await
            .unwrap();
        assert_eq!(read.joined(), "remember this");
    }

    #[tokio::test]
    async fn missing_file_is_soft_text() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        let result = provider
            .call_tool("read_file", json!({"path": "ghost.txt"}))
            .await
            .unwrap();
        assert!(result.joined().contains("no file at"));
    }

    #[tokio::test]
    async fn list_dir_sorts_and_marks_directories() {
        let dir = TempDir::new().unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "x").await.unwrap();
        let provider = provider(&dir);

        let result = provider.call_tool("list_dir", json!({})).await.unwrap();
        assert_eq!(result.joined(), "a.txt\nsub/");
    }

    #[tokio::test]
    async fn exec_captures_output_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        let ok = provider
            .call_tool("exec", json!({"command": "echo out; echo err >&2"}))
            .await
            .unwrap();
        assert!(ok.joined().contains("out"));
        assert!(ok.joined().contains("STDERR:"));

        let failed = provider
            .call_tool("exec", json!({"command": "exit 3"}))
            .await
            .unwrap();
        assert!(failed.joined().contains("exit code: 3"));
    }

    #[tokio::test]
    async fn bad_arguments_are_an_execution_error() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);

        let result = provider.call_tool("read_file", json!({"file": "x"})).await;
        assert!(matches!(result, Err(ToolError::Execution(_))));
    }
}
