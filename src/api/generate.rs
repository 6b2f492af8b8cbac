use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::error;

use crate::{
    error::{ApiResult, AppError},
    server::AppState,
    types::{Session, Song},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    pub num_songs: usize,
}

pub async fn generate_playlist(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<Song>>> {
    let Json(request) = payload?;

    match state
        .generator
        .generate(&request.prompt, request.num_songs)
        .await
    {
        Ok(songs) => Ok(Json(songs)),
        Err(e) if e.is_invalid_input() => Err(AppError::Validation(e.to_string())),
        Err(e) => {
            error!(user = %session.user.id, error = %e, "playlist generation failed");
            Err(AppError::Upstream("Failed to generate playlist".to_string()))
        }
    }
}
