// shoutbot-core/src/auth/token_store.rs

use std::path::{Path, PathBuf};

use shoutbot_common::models::TokenSet;
use tracing::debug;

use crate::Error;

/// Durable JSON file holding the bot account's token pair.
#[derive(Debug, Clone)]
pub struct TokenFileStore {
    path: PathBuf,
}

impl TokenFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub async fn load(&self) -> Result<Option<TokenSet>, Error> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, tokens: &TokenSet) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(tokens)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Saved bot token to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenFileStore::new(dir.path().join("Properties").join("twitch_token.json"));
        assert!(store.load().await.unwrap().is_none());

        let tokens = TokenSet {
            access_token: "abc".into(),
            refresh_token: "def".into(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        };
        store.save(&tokens).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        let store = TokenFileStore::new(path);
        assert!(matches!(store.load().await, Err(Error::Json(_))));
    }
}
