use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::{
    spotify::{SpotifyClient, SpotifyError},
    storage::{StoreError, TokenStore},
    types::{Token, TokenRecord},
};

/// Seconds before the recorded expiry at which a token counts as expired.
const EXPIRY_MARGIN_SECS: i64 = 240;

/// Builds the record to store for a token answer.
///
/// `previous_refresh` is kept when the answer does not rotate the refresh
/// token.
pub fn token_record(user_id: &str, token: Token, previous_refresh: Option<&str>) -> TokenRecord {
    let now = Utc::now();
    TokenRecord {
        user_id: user_id.to_string(),
        access_token: token.access_token,
        refresh_token: token
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default(),
        expires_at: token.expires_in.map(|secs| now + Duration::seconds(secs)),
        updated_at: now,
    }
}

/// Hands out usable Spotify access tokens for one user.
pub struct TokenManager<'a> {
    spotify: &'a SpotifyClient,
    store: &'a dyn TokenStore,
    token: TokenRecord,
}

impl<'a> TokenManager<'a> {
    pub fn new(spotify: &'a SpotifyClient, store: &'a dyn TokenStore, token: TokenRecord) -> Self {
        TokenManager {
            spotify,
            store,
            token,
        }
    }

    /// Loads the stored token of `user_id`; `None` means not connected.
    pub async fn load(
        spotify: &'a SpotifyClient,
        store: &'a dyn TokenStore,
        user_id: &str,
    ) -> Result<Option<Self>, StoreError> {
        Ok(store
            .get_token(user_id)
            .await?
            .map(|token| Self::new(spotify, store, token)))
    }

    /// Returns an access token, refreshing it first when it is about to
    /// expire.
    ///
    /// When the refresh is refused the stored token is deleted and
    /// [`SpotifyError::Unauthorized`] is returned, so the caller asks the
    /// user to reconnect. Transient refresh failures are passed through and
    /// leave the stored token alone.
    pub async fn get_valid_token(&mut self) -> Result<String, SpotifyError> {
        if self.is_expired(Utc::now()) {
            let refreshed = self.spotify.refresh_token(&self.token.refresh_token).await;
            match refreshed {
                Ok(new_token) => {
                    self.token = token_record(
                        &self.token.user_id,
                        new_token,
                        Some(&self.token.refresh_token),
                    );
                    if let Err(e) = self.store.upsert_token(self.token.clone()).await {
                        warn!(
                            user = %self.token.user_id,
                            error = %e,
                            "failed to persist refreshed spotify token"
                        );
                    }
                    info!(user = %self.token.user_id, "spotify token refreshed");
                }
                Err(e) if e.revokes_authorization() => {
                    warn!(user = %self.token.user_id, error = %e, "spotify refresh refused");
                    self.disconnect().await;
                    return Err(SpotifyError::Unauthorized);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(self.token.access_token.clone())
    }

    /// Forgets the stored token; the user is back to not connected.
    pub async fn disconnect(&self) {
        if let Err(e) = self.store.delete_token(&self.token.user_id).await {
            warn!(user = %self.token.user_id, error = %e, "failed to delete spotify token");
        }
    }

    /// Tokens stored without an expiry are used until Spotify rejects them.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.token.expires_at {
            Some(expires_at) => now >= expires_at - Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }
}
