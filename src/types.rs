use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a playlist.
///
/// `album_art` is always serialized so clients can rely on the key being
/// present; it is `null` when enrichment found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub title: String,
    pub artist: String,
    #[serde(default, alias = "album_art")]
    pub album_art: Option<String>,
    #[serde(
        default,
        alias = "spotify_id",
        alias = "platformId",
        skip_serializing_if = "Option::is_none"
    )]
    pub spotify_id: Option<String>,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album_art: None,
            spotify_id: None,
        }
    }

    /// Free-text catalog query for this song.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.title, self.artist)
    }
}

/// A persisted playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub prompt: String,
    pub songs: Vec<Song>,
    pub created_at: DateTime<Utc>,
}

/// A playlist as submitted for saving, before the store assigns an id and
/// timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlaylist {
    pub user_id: String,
    pub name: String,
    pub prompt: String,
    pub songs: Vec<Song>,
}

/// Stored Spotify credentials of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Tokens as answered by the Spotify token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// The authenticated user behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A verified session, attached to requests by the session gate.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
}

/// Export targets understood by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    Apple,
    Tidal,
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spotify" => Ok(Platform::Spotify),
            "apple" => Ok(Platform::Apple),
            "tidal" => Ok(Platform::Tidal),
            other => Err(format!("Unsupported platform: {}", other)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Spotify => "Spotify",
            Platform::Apple => "Apple Music",
            Platform::Tidal => "Tidal",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistResponse {
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub tracks: Tracks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracks {
    pub items: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub uri: String,
}

/// Result of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub playlist_id: String,
    pub tracks_added: usize,
}
