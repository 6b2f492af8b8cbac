use super::{SpotifyClient, SpotifyError};
use crate::types::{
    AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, CreatePlaylistRequest,
    CreatePlaylistResponse,
};

/// Most URIs Spotify accepts in one add-tracks call.
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

pub const PLAYLIST_DESCRIPTION: &str = "Created with Sangeetam";

impl SpotifyClient {
    /// Creates a private playlist for the token's owner.
    pub async fn create_playlist(
        &self,
        token: &str,
        name: &str,
    ) -> Result<CreatePlaylistResponse, SpotifyError> {
        let url = self.api("/me/playlists");
        let body = CreatePlaylistRequest {
            name: name.to_string(),
            description: PLAYLIST_DESCRIPTION.to_string(),
            public: false,
        };

        let response = self
            .send(|| self.http.post(&url).bearer_auth(token).json(&body))
            .await?;

        Ok(response.json::<CreatePlaylistResponse>().await?)
    }

    /// Appends `uris` in order, in batches of [`MAX_TRACKS_PER_REQUEST`].
    ///
    /// Returns the snapshot id of the last batch.
    pub async fn add_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<Option<String>, SpotifyError> {
        let url = self.api(&format!("/playlists/{}/tracks", playlist_id));
        let mut snapshot = None;

        for chunk in uris.chunks(MAX_TRACKS_PER_REQUEST) {
            let body = AddTrackToPlaylistRequest {
                uris: chunk.to_vec(),
            };
            let response = self
                .send(|| self.http.post(&url).bearer_auth(token).json(&body))
                .await?;
            snapshot = Some(response.json::<AddTrackToPlaylistResponse>().await?.snapshot_id);
        }

        Ok(snapshot)
    }

    /// Removes the playlist from the user's library, Spotify's equivalent of
    /// deleting it.
    pub async fn unfollow_playlist(
        &self,
        token: &str,
        playlist_id: &str,
    ) -> Result<(), SpotifyError> {
        let url = self.api(&format!("/playlists/{}/followers", playlist_id));
        self.send(|| self.http.delete(&url).bearer_auth(token))
            .await?;
        Ok(())
    }
}
