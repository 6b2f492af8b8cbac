//! # Storage
//!
//! Persistence for playlists and connector tokens. Two backends implement
//! the same traits:
//!
//! - [`FileStore`] keeps JSON documents in the local data directory and is
//!   the default for development and tests.
//! - [`SupabaseStore`] talks to the managed PostgREST tables `playlists` and
//!   `user_tokens`.
//!
//! Handlers only see `Arc<dyn PlaylistStore>` and `Arc<dyn TokenStore>`.

mod file;
mod supabase;

pub use file::FileStore;
pub use supabase::SupabaseStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{NewPlaylist, Playlist, TokenRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store answered {status}: {body}")]
    Backend {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Inserts a new playlist and returns it with its id and timestamp.
    async fn save(&self, playlist: NewPlaylist) -> Result<Playlist, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Playlist, StoreError>;

    /// All playlists of `user_id`, newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<Playlist>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when there is nothing to delete.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self, user_id: &str) -> Result<Option<TokenRecord>, StoreError>;

    async fn upsert_token(&self, record: TokenRecord) -> Result<(), StoreError>;

    /// Removing a token that does not exist is not an error.
    async fn delete_token(&self, user_id: &str) -> Result<(), StoreError>;
}
