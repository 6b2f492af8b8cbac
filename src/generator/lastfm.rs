use futures::{StreamExt, stream};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{config::LastFmConfig, types::Song};

// Last.fm nests its JSON awkwardly; only the path to the images is modelled.

#[derive(Debug, Deserialize)]
struct TrackInfoResponse {
    #[serde(default)]
    track: Option<TrackInfo>,
}

#[derive(Debug, Deserialize)]
struct TrackInfo {
    #[serde(default)]
    album: Option<AlbumInfo>,
}

#[derive(Debug, Deserialize)]
struct AlbumInfo {
    #[serde(default)]
    image: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    #[serde(rename = "#text", default)]
    url: String,
}

/// Album-art lookups against Last.fm `track.getInfo`.
#[derive(Debug, Clone)]
pub struct LastFmClient {
    http: Client,
    config: LastFmConfig,
}

impl LastFmClient {
    pub fn new(http: Client, config: LastFmConfig) -> Self {
        Self { http, config }
    }

    /// URL of the largest album image Last.fm knows for `song`.
    ///
    /// Last.fm orders images from small to extra large, so the last
    /// non-empty one wins.
    pub async fn album_art(&self, song: &Song) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .http
            .get(&self.config.api_url)
            .query(&[
                ("method", "track.getInfo"),
                ("api_key", self.config.api_key.as_str()),
                ("artist", song.artist.as_str()),
                ("track", song.title.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let info = response.json::<TrackInfoResponse>().await?;

        Ok(info
            .track
            .and_then(|t| t.album)
            .and_then(|a| a.image.into_iter().rev().find(|i| !i.url.trim().is_empty()))
            .map(|i| i.url))
    }

    /// Attaches album art to every song.
    ///
    /// Lookups run concurrently, at most `concurrency` at a time, and the
    /// output keeps the input order. A failed lookup leaves `album_art` as
    /// `None` without affecting the others.
    pub async fn enrich(&self, songs: Vec<Song>, concurrency: usize) -> Vec<Song> {
        stream::iter(songs)
            .map(|mut song| async move {
                match self.album_art(&song).await {
                    Ok(art) => {
                        if art.is_none() {
                            debug!(
                                title = %song.title,
                                artist = %song.artist,
                                "no album art found"
                            );
                        }
                        song.album_art = art;
                    }
                    Err(e) => {
                        warn!(
                            title = %song.title,
                            artist = %song.artist,
                            error = %e,
                            "album art lookup failed"
                        );
                        song.album_art = None;
                    }
                }
                song
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
