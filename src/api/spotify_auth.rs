use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    error::{ApiResult, AppError},
    management::token_record,
    server::AppState,
    types::Session,
    utils,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Starts the Spotify authorization, or completes it when Spotify sends the
/// user back with a `code`.
pub async fn spotify_auth(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let user_id = session.user.id.as_str();

    if let Some(reason) = params.error {
        // burn the nonce, the attempt is over
        if let Some(nonce) = params.state.as_deref() {
            let _ = state.pending.complete(nonce, user_id).await;
        }
        warn!(user = %user_id, %reason, "spotify authorization denied");
        return Err(AppError::Validation(format!(
            "Spotify authorization failed: {}",
            reason
        )));
    }

    let Some(code) = params.code else {
        let (nonce, verifier) = state.pending.begin(user_id).await;
        let challenge = utils::generate_code_challenge(&verifier);
        let url = state.spotify.authorize_url(&nonce, &challenge).map_err(|e| {
            error!(error = %e, "cannot build spotify authorize url");
            AppError::Upstream("Failed to start Spotify authorization".to_string())
        })?;
        info!(user = %user_id, "spotify authorization started");
        return Ok(Redirect::temporary(&url));
    };

    let nonce = params
        .state
        .ok_or_else(|| AppError::Validation("Missing authorization state".to_string()))?;
    let verifier = state
        .pending
        .complete(&nonce, user_id)
        .await
        .map_err(|e| {
            warn!(user = %user_id, error = %e, "spotify callback rejected");
            AppError::Validation("Invalid or expired authorization state".to_string())
        })?;

    let token = state
        .spotify
        .exchange_code(&code, &verifier)
        .await
        .map_err(|e| {
            error!(user = %user_id, error = %e, "spotify token exchange failed");
            AppError::Upstream("Failed to get Spotify access token".to_string())
        })?;

    state
        .tokens
        .upsert_token(token_record(user_id, token, None))
        .await
        .map_err(|e| {
            error!(user = %user_id, error = %e, "storing spotify token failed");
            AppError::Persistence("Failed to store Spotify tokens".to_string())
        })?;

    info!(user = %user_id, "spotify connected");
    Ok(Redirect::temporary(&format!(
        "{}/profile",
        state.config.public_base_url.trim_end_matches('/')
    )))
}
