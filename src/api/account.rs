use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::gate::SESSION_COOKIE;
use crate::{
    error::{ApiResult, AppError},
    server::AppState,
    session::SessionError,
    types::Session,
};

/// Lifetime of the session cookie when the provider does not say.
const DEFAULT_SESSION_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::Validation("Email and password are required".to_string()));
        }
        Ok(())
    }
}

fn session_cookie(state: &AppState, value: &str, max_age: i64) -> String {
    let secure = if state.config.public_base_url.starts_with("https://") {
        "; Secure"
    } else {
        ""
    };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        SESSION_COOKIE, value, max_age, secure
    )
}

pub async fn sign_in(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    request.validate()?;

    let signed_in = match state.sessions.sign_in(request.email.trim(), &request.password).await {
        Ok(signed_in) => signed_in,
        Err(SessionError::InvalidCredentials) => return Err(AppError::Unauthorized),
        Err(e) => {
            error!(error = %e, "sign-in failed");
            return Err(AppError::Upstream("Failed to sign in".to_string()));
        }
    };
    info!(user = %signed_in.user.id, "signed in");

    let max_age = signed_in.expires_in.unwrap_or(DEFAULT_SESSION_SECS);
    let cookie = session_cookie(&state, &signed_in.access_token, max_age);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "user": signed_in.user })),
    ))
}

pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    request.validate()?;

    match state.sessions.sign_up(request.email.trim(), &request.password).await {
        Ok(()) => Ok(Json(json!({ "message": "Check your email to confirm your account" }))),
        Err(SessionError::Provider { status, body }) if status.is_client_error() => {
            warn!(%status, %body, "sign-up rejected");
            Err(AppError::Validation("Sign up failed".to_string()))
        }
        Err(e) => {
            error!(error = %e, "sign-up failed");
            Err(AppError::Upstream("Sign up failed".to_string()))
        }
    }
}

pub async fn sign_out(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    if let Err(e) = state.sessions.sign_out(&session.access_token).await {
        warn!(user = %session.user.id, error = %e, "could not revoke session");
    }

    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(SET_COOKIE, session_cookie(&state, "", 0))]),
    )
}
