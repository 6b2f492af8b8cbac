//! Client for the Supabase auth API (GoTrue).
//!
//! Resolves session tokens to users for the session gate, and proxies the
//! account operations (sign-in, sign-up, sign-out).

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::SupabaseConfig, types::User};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("auth provider answered {status}: {body}")]
    Provider { status: StatusCode, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Tokens handed out by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignIn {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: User,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct SessionProvider {
    http: Client,
    config: SupabaseConfig,
}

impl SessionProvider {
    pub fn new(http: Client, config: SupabaseConfig) -> Self {
        Self { http, config }
    }

    fn auth(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.config.url.trim_end_matches('/'), path)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.config.anon_key)
    }

    /// Resolves `access_token` to its user.
    ///
    /// `Ok(None)` means the token is unknown or expired; any other failure
    /// of the provider is an error.
    pub async fn current_user(&self, access_token: &str) -> Result<Option<User>, SessionError> {
        let response = self
            .with_key(self.http.get(self.auth("/user")))
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json::<User>().await?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(provider_error(response).await),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, SessionError> {
        let response = self
            .with_key(self.http.post(self.auth("/token")))
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<SignIn>().await?),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(SessionError::InvalidCredentials)
            }
            _ => Err(provider_error(response).await),
        }
    }

    /// Registers a new account. Depending on the project settings the user
    /// may have to confirm the address before signing in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), SessionError> {
        let response = self
            .with_key(self.http.post(self.auth("/signup")))
            .json(&Credentials { email, password })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(provider_error(response).await)
        }
    }

    /// Revokes the session. An already invalid token counts as signed out.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SessionError> {
        let response = self
            .with_key(self.http.post(self.auth("/logout")))
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(()),
            _ => Err(provider_error(response).await),
        }
    }
}

async fn provider_error(response: Response) -> SessionError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    SessionError::Provider { status, body }
}
