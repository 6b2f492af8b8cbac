use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::{ApiResult, AppError},
    server::AppState,
    storage::StoreError,
    types::{NewPlaylist, Playlist, Session, Song},
};

#[derive(Debug, Deserialize)]
pub struct SavePlaylistRequest {
    pub name: Option<String>,
    pub songs: Option<Vec<Song>>,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct SavePlaylistResponse {
    pub playlist: Playlist,
    pub message: &'static str,
}

pub async fn save_playlist(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<SavePlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<SavePlaylistResponse>> {
    let Json(request) = payload?;

    let (Some(name), Some(songs)) = (request.name.filter(|n| !n.trim().is_empty()), request.songs)
    else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };

    let playlist = state
        .playlists
        .save(NewPlaylist {
            user_id: session.user.id.clone(),
            name,
            prompt: request.prompt,
            songs,
        })
        .await
        .map_err(|e| {
            error!(user = %session.user.id, error = %e, "saving playlist failed");
            AppError::Persistence("Failed to save playlist".to_string())
        })?;

    info!(
        user = %session.user.id,
        playlist = %playlist.id,
        songs = playlist.songs.len(),
        "playlist saved"
    );
    Ok(Json(SavePlaylistResponse {
        playlist,
        message: "Playlist saved successfully",
    }))
}

pub async fn list_playlists(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<Json<Vec<Playlist>>> {
    let playlists = state.playlists.list(&session.user.id).await.map_err(|e| {
        error!(user = %session.user.id, error = %e, "listing playlists failed");
        AppError::Persistence("Failed to load playlists".to_string())
    })?;

    Ok(Json(playlists))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<Json<Playlist>> {
    let playlist = owned_playlist(&state, &session, &id).await?;
    Ok(Json(playlist))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let playlist = owned_playlist(&state, &session, &id).await?;

    match state.playlists.delete(playlist.id).await {
        Ok(()) => {
            info!(user = %session.user.id, playlist = %playlist.id, "playlist deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::NotFound) => Err(not_found()),
        Err(e) => {
            error!(user = %session.user.id, error = %e, "deleting playlist failed");
            Err(AppError::Persistence("Failed to delete playlist".to_string()))
        }
    }
}

/// Loads a playlist, hiding the ones owned by other users.
async fn owned_playlist(state: &AppState, session: &Session, id: &str) -> ApiResult<Playlist> {
    let id = Uuid::parse_str(id).map_err(|_| not_found())?;

    match state.playlists.get(id).await {
        Ok(playlist) if playlist.user_id == session.user.id => Ok(playlist),
        Ok(_) | Err(StoreError::NotFound) => Err(not_found()),
        Err(e) => {
            error!(user = %session.user.id, error = %e, "loading playlist failed");
            Err(AppError::Persistence("Failed to load playlist".to_string()))
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Playlist not found".to_string())
}
