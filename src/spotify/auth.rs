use reqwest::Url;

use super::{SpotifyClient, SpotifyError};
use crate::types::Token;

impl SpotifyClient {
    /// Builds the URL the user is redirected to for granting access.
    ///
    /// `state` is the opaque nonce that ties the callback to the pending
    /// authorization; `code_challenge` is the S256 PKCE challenge of the
    /// verifier kept next to it.
    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> Result<String, SpotifyError> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("state", state),
                ("code_challenge_method", "S256"),
                ("code_challenge", code_challenge),
            ],
        )
        .map_err(|e| SpotifyError::Config(format!("{}: {}", self.config.auth_url, e)))?;

        Ok(url.into())
    }

    /// Exchanges an authorization code for access and refresh tokens.
    ///
    /// The client authenticates with its id and secret (HTTP basic) and
    /// proves possession of the PKCE `verifier`.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Token, SpotifyError> {
        let response = self
            .send(|| {
                self.http
                    .post(&self.config.token_url)
                    .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                    .form(&[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("redirect_uri", self.config.redirect_uri.as_str()),
                        ("code_verifier", verifier),
                    ])
            })
            .await?;

        Ok(response.json::<Token>().await?)
    }

    /// Trades a refresh token for a fresh access token.
    ///
    /// Spotify may or may not rotate the refresh token; callers keep the old
    /// one when the answer carries none.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Token, SpotifyError> {
        let response = self
            .send(|| {
                self.http
                    .post(&self.config.token_url)
                    .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("refresh_token", refresh_token),
                    ])
            })
            .await?;

        Ok(response.json::<Token>().await?)
    }
}
