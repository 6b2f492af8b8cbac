//! # Spotify Integration Module
//!
//! Thin client over the parts of the Spotify Web API the exporter needs:
//!
//! - [`auth`]: authorization URL, code exchange and token refresh
//!   (authorization code flow with client secret and PKCE)
//! - [`search`]: track lookup by free-text query
//! - [`playlist`]: playlist creation, batched track addition and unfollowing
//!
//! All calls go through [`SpotifyClient::send`], which maps a `401` to
//! [`SpotifyError::Unauthorized`] and retries rate limits (`429` with an
//! acceptable `Retry-After`) and, for `GET`/`DELETE` only, `502 Bad Gateway`
//! a bounded number of times.

pub mod auth;
pub mod playlist;
pub mod search;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header::RETRY_AFTER};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::SpotifyConfig;

#[derive(Debug, Error)]
pub enum SpotifyError {
    /// The access token was rejected; the user has to reconnect.
    #[error("spotify rejected the access token")]
    Unauthorized,

    #[error("spotify answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid spotify configuration: {0}")]
    Config(String),
}

impl SpotifyError {
    /// Whether the stored grant is unusable (revoked, expired refresh token
    /// or rejected access token) as opposed to a transient failure.
    pub fn revokes_authorization(&self) -> bool {
        match self {
            SpotifyError::Unauthorized => true,
            SpotifyError::Status { status, .. } => *status == StatusCode::BAD_REQUEST,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    config: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(http: Client, config: SpotifyConfig) -> Self {
        Self { http, config }
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    /// Sends the request built by `build`, retrying transient failures.
    ///
    /// `build` is called once per attempt since a sent request cannot be
    /// reused. A `429` is retried for any method, as Spotify did not process
    /// the request. A `502` is only retried for `GET` and `DELETE`; the
    /// upstream may already have applied a `POST`.
    pub(crate) async fn send<F>(&self, build: F) -> Result<Response, SpotifyError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;

        loop {
            let request = build().build()?;
            let idempotent = matches!(*request.method(), Method::GET | Method::DELETE);
            let response = self.http.execute(request).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if status == StatusCode::UNAUTHORIZED {
                return Err(SpotifyError::Unauthorized);
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = self.retry_delay(&response, idempotent) {
                    attempt += 1;
                    warn!(
                        %status,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying spotify request"
                    );
                    sleep(delay).await;
                    continue; // retry
                }
            }

            let body = response.text().await.unwrap_or_default();
            return Err(SpotifyError::Status { status, body });
        }
    }

    fn retry_delay(&self, response: &Response, idempotent: bool) -> Option<Duration> {
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                let delay = Duration::from_secs(retry_after);
                if delay <= self.config.max_retry_after {
                    Some(delay)
                } else {
                    warn!(
                        retry_after,
                        "Retry-After exceeds the configured maximum, not retrying"
                    );
                    None
                }
            }
            StatusCode::BAD_GATEWAY if idempotent => Some(Duration::from_millis(500)),
            _ => None,
        }
    }
}
