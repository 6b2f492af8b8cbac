//! # Playlist Exporter
//!
//! Recreates a playlist on an external platform. Only Spotify is wired up;
//! other platforms are rejected before any remote call.
//!
//! The Spotify export is best-effort per song: a song that cannot be
//! resolved to a catalog track is left out instead of failing the export.
//! Playlist creation and the final track upload, on the other hand, are all
//! or nothing. If the upload fails after the playlist was created, the new
//! playlist is unfollowed again so the user is not left with an empty one.
//! A `401` during search or upload means the authorization was revoked. The
//! playlist is unfollowed and the stored token dropped.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    management::TokenManager,
    spotify::{SpotifyClient, SpotifyError},
    storage::{StoreError, TokenStore},
    types::{ExportOutcome, Platform, Song},
    utils,
};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0} export not implemented yet")]
    NotImplemented(Platform),

    #[error("Spotify not connected")]
    NotConnected,

    #[error("failed to obtain an access token: {0}")]
    Token(#[source] SpotifyError),

    #[error("failed to create playlist: {0}")]
    CreateFailed(#[source] SpotifyError),

    #[error("failed to add tracks to playlist {playlist_id}: {source}")]
    AddTracksFailed {
        playlist_id: String,
        #[source]
        source: SpotifyError,
    },

    #[error("token store error: {0}")]
    Store(#[from] StoreError),
}

pub struct Exporter<'a> {
    spotify: &'a SpotifyClient,
    tokens: &'a dyn TokenStore,
}

impl<'a> Exporter<'a> {
    pub fn new(spotify: &'a SpotifyClient, tokens: &'a dyn TokenStore) -> Self {
        Self { spotify, tokens }
    }

    /// Exports `songs`, in order, as a new playlist called `name`.
    ///
    /// # Errors
    ///
    /// - [`ExportError::NotImplemented`] for any platform other than Spotify.
    /// - [`ExportError::NotConnected`] when the user has no stored token, or
    ///   Spotify answers `401` at any step. The stored token is removed in
    ///   the latter case, and a playlist created before the `401` is
    ///   unfollowed again.
    /// - [`ExportError::Token`] when refreshing an expired token fails for a
    ///   reason other than a revoked authorization.
    /// - [`ExportError::CreateFailed`] and [`ExportError::AddTracksFailed`]
    ///   for the remote playlist calls.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn run(
    /// #     spotify: &sangeetam::spotify::SpotifyClient,
    /// #     tokens: &dyn sangeetam::storage::TokenStore,
    /// # ) -> Result<(), sangeetam::export::ExportError> {
    /// use sangeetam::{
    ///     export::Exporter,
    ///     types::{Platform, Song},
    /// };
    ///
    /// let songs = vec![Song::new("Teardrop", "Massive Attack")];
    /// let outcome = Exporter::new(spotify, tokens)
    ///     .export("user-1", "Rainy Day", &songs, Platform::Spotify)
    ///     .await?;
    /// println!("{} tracks in {}", outcome.tracks_added, outcome.playlist_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn export(
        &self,
        user_id: &str,
        name: &str,
        songs: &[Song],
        platform: Platform,
    ) -> Result<ExportOutcome, ExportError> {
        match platform {
            Platform::Spotify => self.export_to_spotify(user_id, name, songs).await,
            Platform::Apple | Platform::Tidal => Err(ExportError::NotImplemented(platform)),
        }
    }

    async fn export_to_spotify(
        &self,
        user_id: &str,
        name: &str,
        songs: &[Song],
    ) -> Result<ExportOutcome, ExportError> {
        let mut token_mgr = TokenManager::load(self.spotify, self.tokens, user_id)
            .await?
            .ok_or(ExportError::NotConnected)?;

        let token = token_mgr.get_valid_token().await.map_err(|e| match e {
            SpotifyError::Unauthorized => ExportError::NotConnected,
            other => ExportError::Token(other),
        })?;

        let playlist = match self.spotify.create_playlist(&token, name).await {
            Ok(playlist) => playlist,
            Err(SpotifyError::Unauthorized) => {
                token_mgr.disconnect().await;
                return Err(ExportError::NotConnected);
            }
            Err(e) => return Err(ExportError::CreateFailed(e)),
        };
        info!(user = %user_id, playlist = %playlist.id, "spotify playlist created");

        let uris = match self.resolve_tracks(&token, songs).await {
            Ok(uris) => uris,
            Err(_) => {
                self.compensate(&token, &playlist.id).await;
                token_mgr.disconnect().await;
                return Err(ExportError::NotConnected);
            }
        };

        if !uris.is_empty() {
            match self.spotify.add_tracks(&token, &playlist.id, &uris).await {
                Ok(_) => {}
                Err(SpotifyError::Unauthorized) => {
                    self.compensate(&token, &playlist.id).await;
                    token_mgr.disconnect().await;
                    return Err(ExportError::NotConnected);
                }
                Err(source) => {
                    self.compensate(&token, &playlist.id).await;
                    return Err(ExportError::AddTracksFailed {
                        playlist_id: playlist.id,
                        source,
                    });
                }
            }
        }

        info!(
            user = %user_id,
            playlist = %playlist.id,
            requested = songs.len(),
            added = uris.len(),
            "spotify export finished"
        );

        Ok(ExportOutcome {
            playlist_id: playlist.id,
            tracks_added: uris.len(),
        })
    }

    /// Maps songs to track URIs in input order, skipping the ones that
    /// cannot be found.
    ///
    /// A failed search only drops that song, except for a `401`: the
    /// authorization is gone, so the remaining songs are not tried and
    /// [`SpotifyError::Unauthorized`] is returned.
    async fn resolve_tracks(
        &self,
        token: &str,
        songs: &[Song],
    ) -> Result<Vec<String>, SpotifyError> {
        let mut uris = Vec::with_capacity(songs.len());

        for song in songs {
            if let Some(id) = song.spotify_id.as_deref().filter(|id| !id.trim().is_empty()) {
                uris.push(utils::spotify_track_uri(id));
                continue;
            }

            match self.spotify.search_track(token, &song.search_query()).await {
                Ok(Some(uri)) => uris.push(uri),
                Ok(None) => {
                    debug!(
                        title = %song.title,
                        artist = %song.artist,
                        "no catalog match, skipping"
                    )
                }
                Err(SpotifyError::Unauthorized) => return Err(SpotifyError::Unauthorized),
                Err(e) => {
                    warn!(
                        title = %song.title,
                        artist = %song.artist,
                        error = %e,
                        "catalog search failed, skipping"
                    )
                }
            }
        }

        Ok(uris)
    }

    async fn compensate(&self, token: &str, playlist_id: &str) {
        match self.spotify.unfollow_playlist(token, playlist_id).await {
            Ok(()) => info!(playlist = %playlist_id, "removed partially exported playlist"),
            Err(e) => {
                warn!(
                    playlist = %playlist_id,
                    error = %e,
                    "could not remove partially exported playlist"
                )
            }
        }
    }
}
