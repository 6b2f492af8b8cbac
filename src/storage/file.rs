use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tracing::warn;
use uuid::Uuid;

use super::{PlaylistStore, StoreError, TokenStore};
use crate::types::{NewPlaylist, Playlist, TokenRecord};

/// JSON-file backed store.
///
/// Layout below the root directory:
///
/// ```text
/// playlists/<uuid>.json
/// tokens/<user id>.json
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn playlists_dir(&self) -> PathBuf {
        self.root.join("playlists")
    }

    fn playlist_path(&self, id: Uuid) -> PathBuf {
        self.playlists_dir().join(format!("{}.json", id))
    }

    fn token_path(&self, user_id: &str) -> PathBuf {
        // user ids come from the auth provider; keep them from escaping the directory
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join("tokens").join(format!("{}.json", safe))
    }

    async fn persist<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(value)?;
        async_fs::write(path, json).await?;
        Ok(())
    }

    async fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
        match async_fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn remove(path: &Path) -> Result<bool, StoreError> {
        match async_fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[async_trait]
impl PlaylistStore for FileStore {
    async fn save(&self, playlist: NewPlaylist) -> Result<Playlist, StoreError> {
        let record = Playlist {
            id: Uuid::new_v4(),
            user_id: playlist.user_id,
            name: playlist.name,
            prompt: playlist.prompt,
            songs: playlist.songs,
            created_at: Utc::now(),
        };

        Self::persist(&self.playlist_path(record.id), &record).await?;
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Playlist, StoreError> {
        Self::load(&self.playlist_path(id))
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Playlist>, StoreError> {
        let mut entries = match async_fs::read_dir(self.playlists_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut playlists = Vec::new();
        while let Some(entry) = entries.next().await {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match Self::load::<Playlist>(&path).await {
                Ok(Some(playlist)) if playlist.user_id == user_id => playlists.push(playlist),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable playlist file")
                }
            }
        }

        playlists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(playlists)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        if Self::remove(&self.playlist_path(id)).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

#[async_trait]
impl TokenStore for FileStore {
    async fn get_token(&self, user_id: &str) -> Result<Option<TokenRecord>, StoreError> {
        Self::load(&self.token_path(user_id)).await
    }

    async fn upsert_token(&self, record: TokenRecord) -> Result<(), StoreError> {
        Self::persist(&self.token_path(&record.user_id), &record).await
    }

    async fn delete_token(&self, user_id: &str) -> Result<(), StoreError> {
        Self::remove(&self.token_path(user_id)).await.map(|_| ())
    }
}
