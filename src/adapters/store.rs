use crate::domain::model::SeenSet;
use crate::domain::ports::SeenStore;
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Seen set kept as a JSON array of titles in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileSeenStore {
    path: PathBuf,
}

impl JsonFileSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "seen".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persistence_error(&self, message: impl std::fmt::Display) -> BotError {
        BotError::PersistenceError {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    async fn write_atomically(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.persistence_error(e))?;
            }
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| self.persistence_error(e))?;
        file.write_all(data)
            .await
            .map_err(|e| self.persistence_error(e))?;
        file.sync_all()
            .await
            .map_err(|e| self.persistence_error(e))?;
        drop(file);

        // rename over the old file only after the new content is on disk
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.persistence_error(e));
        }
        Ok(())
    }
}

pub fn parse_seen_titles(content: &str) -> Option<SeenSet> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::to_string)
            .collect(),
    )
}

#[async_trait]
impl SeenStore for JsonFileSeenStore {
    async fn load(&self) -> SeenSet {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No seen state yet, starting empty");
                return SeenSet::new();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not read seen state, starting empty"
                );
                return SeenSet::new();
            }
        };

        match parse_seen_titles(&content) {
            Some(seen) => {
                tracing::debug!(
                    path = %self.path.display(),
                    titles = seen.len(),
                    "Loaded seen state"
                );
                seen
            }
            None => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Seen state is not a JSON array of titles, starting empty"
                );
                SeenSet::new()
            }
        }
    }

    async fn save(&self, seen: &SeenSet) -> Result<()> {
        let data = serde_json::to_vec(seen.titles())?;
        self.write_atomically(&data).await?;
        tracing::debug!(path = %self.path.display(), titles = seen.len(), "Saved seen state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileSeenStore::new(dir.path().join("sent_games.json"));

        let seen = store.load().await;
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_games.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = JsonFileSeenStore::new(&path);
        assert!(store.load().await.is_empty());

        tokio::fs::write(&path, r#"{"titles": ["A"]}"#).await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_drops_non_string_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_games.json");
        tokio::fs::write(&path, r#"["A", null, 3, "B"]"#).await.unwrap();

        let store = JsonFileSeenStore::new(&path);
        let seen = store.load().await;
        assert_eq!(seen.titles(), &["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileSeenStore::new(dir.path().join("sent_games.json"));
        let seen: SeenSet = ["Hades", "Celeste", "Control"].into_iter().collect();

        store.save(&seen).await.unwrap();
        let loaded = store.load().await;

        assert_eq!(loaded.len(), 3);
        for title in seen.iter() {
            assert!(loaded.contains(title));
        }
    }

    #[tokio::test]
    async fn test_save_writes_plain_json_array_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("sent_games.json");
        let store = JsonFileSeenStore::new(&path);

        store
            .save(&["A", "B"].into_iter().collect())
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["A", "B"]);
        assert!(!dir.path().join("state").join("sent_games.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_failure_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent_games.json");
        tokio::fs::write(&path, r#"["A"]"#).await.unwrap();
        // a directory where the temp file should go makes the write fail
        tokio::fs::create_dir(dir.path().join("sent_games.json.tmp"))
            .await
            .unwrap();

        let store = JsonFileSeenStore::new(&path);
        let result = store.save(&["A", "B"].into_iter().collect()).await;

        assert!(matches!(result, Err(BotError::PersistenceError { .. })));
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, r#"["A"]"#);
    }
}
