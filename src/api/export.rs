use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    error::{ApiResult, AppError},
    export::{ExportError, Exporter},
    server::AppState,
    types::{Platform, Session, Song},
};

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub songs: Option<Vec<Song>>,
    pub name: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub success: bool,
    pub playlist_id: String,
    pub tracks_added: usize,
}

pub async fn export_playlist(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> ApiResult<Json<ExportResponse>> {
    let Json(request) = payload?;

    let (Some(songs), Some(name), Some(platform)) = (
        request.songs,
        request.name.filter(|n| !n.trim().is_empty()),
        request.platform,
    ) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };
    let platform: Platform = platform
        .parse()
        .map_err(|_| AppError::Validation("Unsupported platform".to_string()))?;

    let exporter = Exporter::new(&state.spotify, state.tokens.as_ref());
    let outcome = exporter
        .export(&session.user.id, &name, &songs, platform)
        .await
        .map_err(|e| {
            let user = session.user.id.as_str();
            match e {
                ExportError::NotImplemented(_) => AppError::NotImplemented(e.to_string()),
                ExportError::NotConnected => AppError::SpotifyNotConnected,
                ExportError::Token(_) => {
                    error!(%user, error = %e, "spotify token refresh failed");
                    AppError::Upstream("Failed to get Spotify access token".to_string())
                }
                ExportError::CreateFailed(_) => {
                    error!(%user, error = %e, "spotify export failed");
                    AppError::Upstream("Failed to create Spotify playlist".to_string())
                }
                ExportError::AddTracksFailed { .. } => {
                    error!(%user, error = %e, "spotify export failed");
                    AppError::Upstream("Failed to add tracks to Spotify playlist".to_string())
                }
                ExportError::Store(_) => {
                    error!(%user, error = %e, "loading spotify token failed");
                    AppError::Persistence("Failed to export playlist".to_string())
                }
            }
        })?;

    Ok(Json(ExportResponse {
        success: true,
        playlist_id: outcome.playlist_id,
        tracks_added: outcome.tracks_added,
    }))
}
