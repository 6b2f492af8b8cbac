use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PlaylistStore, StoreError, TokenStore};
use crate::types::{NewPlaylist, Playlist, Song, TokenRecord};

/// Store backed by the Supabase PostgREST API.
///
/// Requests use the service-role key; ownership checks happen in the
/// handlers, not in row-level security.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    http: Client,
    rest_url: String,
    service_key: String,
}

/// Song as stored in the `playlists.songs` JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SongRow {
    title: String,
    artist: String,
    #[serde(default)]
    album_art: Option<String>,
    #[serde(default)]
    spotify_id: Option<String>,
}

impl From<Song> for SongRow {
    fn from(song: Song) -> Self {
        Self {
            title: song.title,
            artist: song.artist,
            album_art: song.album_art,
            spotify_id: song.spotify_id,
        }
    }
}

impl From<SongRow> for Song {
    fn from(row: SongRow) -> Self {
        Self {
            title: row.title,
            artist: row.artist,
            album_art: row.album_art,
            spotify_id: row.spotify_id,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewPlaylistRow {
    user_id: String,
    name: String,
    prompt: String,
    songs: Vec<SongRow>,
}

#[derive(Debug, Deserialize)]
struct PlaylistRow {
    id: Uuid,
    user_id: String,
    name: String,
    #[serde(default)]
    prompt: Option<String>,
    songs: Vec<SongRow>,
    created_at: DateTime<Utc>,
}

impl From<PlaylistRow> for Playlist {
    fn from(row: PlaylistRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            prompt: row.prompt.unwrap_or_default(),
            songs: row.songs.into_iter().map(Song::from).collect(),
            created_at: row.created_at,
        }
    }
}

/// Row of `user_tokens`.
///
/// `spotify_expires_at` is added by
/// `supabase/migrations/20240601000000_user_tokens_expires_at.sql`. It is left
/// out of the payload when unknown so deployments without the migration keep
/// accepting writes.
#[derive(Debug, Serialize, Deserialize)]
struct TokenRow {
    user_id: String,
    spotify_access_token: String,
    spotify_refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spotify_expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl From<TokenRecord> for TokenRow {
    fn from(record: TokenRecord) -> Self {
        Self {
            user_id: record.user_id,
            spotify_access_token: record.access_token,
            spotify_refresh_token: record.refresh_token,
            spotify_expires_at: record.expires_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<TokenRow> for TokenRecord {
    fn from(row: TokenRow) -> Self {
        Self {
            user_id: row.user_id,
            access_token: row.spotify_access_token,
            refresh_token: row.spotify_refresh_token,
            expires_at: row.spotify_expires_at,
            updated_at: row.updated_at,
        }
    }
}

impl SupabaseStore {
    pub fn new(http: Client, supabase_url: &str, service_key: impl Into<String>) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            service_key: service_key.into(),
        }
    }

    fn table(&self, method: reqwest::Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn checked(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Backend { status, body })
        }
    }

    async fn rows<T: serde::de::DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<Vec<T>, StoreError> {
        let response = Self::checked(request.send().await?).await?;
        Ok(response.json::<Vec<T>>().await?)
    }
}

#[async_trait]
impl PlaylistStore for SupabaseStore {
    async fn save(&self, playlist: NewPlaylist) -> Result<Playlist, StoreError> {
        let row = NewPlaylistRow {
            user_id: playlist.user_id,
            name: playlist.name,
            prompt: playlist.prompt,
            songs: playlist.songs.into_iter().map(SongRow::from).collect(),
        };

        let request = self
            .table(reqwest::Method::POST, "playlists")
            .header("Prefer", "return=representation")
            .json(&[row]);

        Self::rows::<PlaylistRow>(request)
            .await?
            .into_iter()
            .next()
            .map(Playlist::from)
            .ok_or(StoreError::NotFound)
    }

    async fn get(&self, id: Uuid) -> Result<Playlist, StoreError> {
        let request = self
            .table(reqwest::Method::GET, "playlists")
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())]);

        Self::rows::<PlaylistRow>(request)
            .await?
            .into_iter()
            .next()
            .map(Playlist::from)
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<Playlist>, StoreError> {
        let request = self.table(reqwest::Method::GET, "playlists").query(&[
            ("user_id", format!("eq.{}", user_id)),
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ]);

        Ok(Self::rows::<PlaylistRow>(request)
            .await?
            .into_iter()
            .map(Playlist::from)
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let request = self
            .table(reqwest::Method::DELETE, "playlists")
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))]);

        let deleted = Self::rows::<PlaylistRow>(request).await?;
        if deleted.is_empty() {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TokenStore for SupabaseStore {
    async fn get_token(&self, user_id: &str) -> Result<Option<TokenRecord>, StoreError> {
        let request = self.table(reqwest::Method::GET, "user_tokens").query(&[
            ("user_id", format!("eq.{}", user_id)),
            ("select", "*".to_string()),
        ]);

        Ok(Self::rows::<TokenRow>(request)
            .await?
            .into_iter()
            .next()
            .map(TokenRecord::from))
    }

    async fn upsert_token(&self, record: TokenRecord) -> Result<(), StoreError> {
        let request = self
            .table(reqwest::Method::POST, "user_tokens")
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[TokenRow::from(record)]);

        Self::checked(request.send().await?).await?;
        Ok(())
    }

    async fn delete_token(&self, user_id: &str) -> Result<(), StoreError> {
        let request = self
            .table(reqwest::Method::DELETE, "user_tokens")
            .query(&[("user_id", format!("eq.{}", user_id))]);

        Self::checked(request.send().await?).await?;
        Ok(())
    }
}
