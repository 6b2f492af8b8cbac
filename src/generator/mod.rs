//! # Playlist Generator
//!
//! Turns a natural-language prompt into an ordered list of songs.
//!
//! 1. [`gemini`] asks the LLM for a strict JSON array of `{title, artist}`
//!    and hardens the answer (fence stripping, shape validation, exact
//!    count).
//! 2. [`lastfm`] enriches each song with album art, concurrently but
//!    order-preserving, with a per-song fallback to `null`.

pub mod gemini;
pub mod lastfm;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

use crate::{
    config::{Config, GeneratorConfig},
    types::Song,
};
use gemini::GeminiClient;
use lastfm::LastFmClient;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("number of songs must be between 1 and {max}, got {requested}")]
    InvalidSongCount { requested: usize, max: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model answered {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("model answer is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model answer is not a JSON array")]
    NotAnArray,

    #[error("model returned {got} usable songs, expected {expected}")]
    TooFewSongs { expected: usize, got: usize },
}

impl GenerationError {
    /// Whether the caller, rather than an upstream, is at fault.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            GenerationError::EmptyPrompt | GenerationError::InvalidSongCount { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct PlaylistGenerator {
    gemini: GeminiClient,
    lastfm: LastFmClient,
    config: GeneratorConfig,
}

impl PlaylistGenerator {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            gemini: GeminiClient::new(http.clone(), config.gemini.clone()),
            lastfm: LastFmClient::new(http, config.lastfm.clone()),
            config: config.generator.clone(),
        }
    }

    /// Generates `num_songs` songs for `prompt`, each enriched with album art.
    ///
    /// Songs come back in the order the model listed them. A failed album art
    /// lookup leaves `album_art` empty instead of failing the call.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::EmptyPrompt`] and
    ///   [`GenerationError::InvalidSongCount`] are checked before any remote
    ///   call; [`GenerationError::is_invalid_input`] is true for both.
    /// - The remaining variants describe a failed or unusable model answer,
    ///   including one with fewer usable songs than requested.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn run(
    /// #     generator: &sangeetam::generator::PlaylistGenerator,
    /// # ) -> Result<(), sangeetam::generator::GenerationError> {
    /// let songs = generator.generate("rainy sunday morning", 12).await?;
    /// for song in &songs {
    ///     println!("{} - {}", song.artist, song.title);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn generate(
        &self,
        prompt: &str,
        num_songs: usize,
    ) -> Result<Vec<Song>, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        if num_songs == 0 || num_songs > self.config.max_songs {
            return Err(GenerationError::InvalidSongCount {
                requested: num_songs,
                max: self.config.max_songs,
            });
        }

        let text = self
            .gemini
            .complete(&gemini::build_instruction(prompt, num_songs))
            .await?;
        let songs = gemini::parse_songs(&text, num_songs)?;

        let songs = self
            .lastfm
            .enrich(songs, self.config.enrich_concurrency)
            .await;

        info!(
            songs = songs.len(),
            with_art = songs.iter().filter(|s| s.album_art.is_some()).count(),
            "playlist generated"
        );

        Ok(songs)
    }
}
