use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error};

use crate::{error::AppError, server::AppState, types::Session, utils};

/// Cookie carrying the auth provider's access token.
pub const SESSION_COOKIE: &str = "sb-access-token";

pub const SIGN_IN_PATH: &str = "/auth/signin";

fn is_auth_path(path: &str) -> bool {
    path.starts_with("/auth/")
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Resolves the session of every request before it reaches a handler.
///
/// | session | path          | outcome                         |
/// |---------|---------------|---------------------------------|
/// | any     | `/health`     | passed through                  |
/// | none    | `/auth/*`     | passed through                  |
/// | none    | `/api/*`      | passed through, handler answers 401 |
/// | none    | anything else | 307 to the sign-in page         |
/// | some    | `/auth/*`     | 307 to `/`                      |
/// | some    | anything else | passed through with the session |
pub async fn session_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if path == "/health" {
        return next.run(request).await;
    }

    let session = match resolve_session(&state, request.headers()).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    match session {
        Some(_) if is_auth_path(&path) => Redirect::temporary("/").into_response(),
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None if is_auth_path(&path) || is_api_path(&path) => next.run(request).await,
        None => {
            debug!(%path, "no session, redirecting to sign-in");
            Redirect::temporary(SIGN_IN_PATH).into_response()
        }
    }
}

async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Session>, AppError> {
    let Some(access_token) =
        utils::cookie_value(headers, SESSION_COOKIE).or_else(|| utils::bearer_token(headers))
    else {
        return Ok(None);
    };

    let user = state.sessions.current_user(&access_token).await.map_err(|e| {
        error!(error = %e, "session lookup failed");
        AppError::Upstream("Failed to verify session".to_string())
    })?;

    Ok(user.map(|user| Session { user, access_token }))
}

/// Handlers take a [`Session`] argument to require a signed-in user.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
