//! Saved conversations: a JSON array of `{"role", "content"}` records.

use crate::config::write_pretty_json;
use crate::error::{ChatError, Result};
use crate::turn::ChatTurn;
use std::path::Path;
use tracing::info;

/// Write `turns` to `path`.
///
/// # Errors
///
/// Rejects an empty history, and fails if the file cannot be written.
pub fn save(path: &Path, turns: &[ChatTurn]) -> Result<()> {
    if turns.is_empty() {
        return Err(ChatError::Config("no chat history to save".into()));
    }
    write_pretty_json(path, turns)?;
    info!(path = %path.display(), turns = turns.len(), "history saved");
    Ok(())
}

/// Read turns from `path`.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a list of turns.
pub fn load(path: &Path) -> Result<Vec<ChatTurn>> {
    let content = std::fs::read_to_string(path)?;
    let turns: Vec<ChatTurn> = serde_json::from_str(&content)?;
    info!(path = %path.display(), turns = turns.len(), "history loaded");
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        let turns = vec![
            ChatTurn::user("What is 2+2?"),
            ChatTurn::assistant("<think>easy</think>4"),
        ];
        save(&path, &turns).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[\n    {\n        \"role\": \"user\""));
        assert_eq!(load(&path).unwrap(), turns);
    }

    #[test]
    fn test_empty_history_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        assert!(matches!(save(&path, &[]), Err(ChatError::Config(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_bad_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        std::fs::write(&path, r#"[{"role": "robot", "content": "x"}]"#).unwrap();
        assert!(matches!(load(&path), Err(ChatError::Json(_))));
        assert!(matches!(
            load(&dir.path().join("missing.json")),
            Err(ChatError::Io(_))
        ));
    }
}
