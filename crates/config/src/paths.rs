//! Well-known locations under the engram home directory

use std::path::PathBuf;

/// Engram home (~/.engram)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .expect("failed to locate home directory")
        .join(".engram")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Workspace the filesystem tools operate in
pub fn workspace_path() -> PathBuf {
    data_dir().join("workspace")
}

/// Long-term archive records
pub fn archive_dir() -> PathBuf {
    data_dir().join("archive")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

/// Sanitize a string for use as a filename
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_filename_replaces_separators() {
        assert_eq!(safe_filename("a/b:c"), "a_b_c");
        assert_eq!(safe_filename("plain-name_1"), "plain-name_1");
    }

    #[test]
    fn well_known_paths_nest_under_data_dir() {
        let root = data_dir();
        assert!(config_path().starts_with(&root));
        assert!(workspace_path().starts_with(&root));
        assert!(archive_dir().starts_with(&root));
    }
}
