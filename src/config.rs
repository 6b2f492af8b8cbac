//! Configuration management for the Sangeetam service.
//!
//! This module handles loading configuration values from environment
//! variables and `.env` files and collects them into a single [`Config`]
//! value. The configuration is built once at start-up and handed to every
//! component explicitly, so no component reads the environment on its own.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the working directory
//! 3. `.env` file in the local data directory
//! 4. Application defaults (where applicable)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

/// Errors raised while assembling the [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Which persistence backend the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "supabase" => Ok(StoreBackend::Supabase),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Supabase project settings, used for sessions and (optionally) storage.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// Service-role key; required only by the PostgREST store backend.
    pub service_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct LastFmConfig {
    pub api_url: String,
    pub api_key: String,
}

/// Spotify application credentials and endpoints.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered with the Spotify application.
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    /// Retries granted for 429/502 answers before giving up.
    pub max_retries: u32,
    /// Longest `Retry-After` the service is willing to sleep through.
    pub max_retry_after: Duration,
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub max_songs: usize,
    pub enrich_concurrency: usize,
}

/// The complete runtime configuration of the service.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    /// Public origin of the front end, used for post-authorization redirects.
    pub public_base_url: String,
    pub data_dir: PathBuf,
    pub store: StoreBackend,
    pub http_timeout: Duration,
    pub supabase: SupabaseConfig,
    pub gemini: GeminiConfig,
    pub lastfm: LastFmConfig,
    pub spotify: SpotifyConfig,
    pub generator: GeneratorConfig,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// Call [`load_env`] first so values from `.env` files are visible.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an unset required key and
    /// [`ConfigError::Invalid`] for a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset. Tests use this to describe their
    /// environment as a map instead of mutating the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`]: [`ConfigError::Missing`] names the first
    /// required key without a value, [`ConfigError::Invalid`] the first value
    /// that does not parse.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    ///
    /// use sangeetam::config::Config;
    ///
    /// let env = HashMap::from([
    ///     ("SUPABASE_URL", "https://project.supabase.co"),
    ///     ("SUPABASE_ANON_KEY", "anon"),
    ///     ("GOOGLE_AI_API_KEY", "gemini"),
    ///     ("LASTFM_API_KEY", "lastfm"),
    ///     ("SPOTIFY_API_AUTH_CLIENT_ID", "client-id"),
    ///     ("SPOTIFY_API_AUTH_CLIENT_SECRET", "client-secret"),
    ///     ("GENERATOR_MAX_SONGS", "20"),
    /// ]);
    ///
    /// let config = Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))?;
    /// assert_eq!(config.generator.max_songs, 20);
    /// # Ok::<(), sangeetam::config::ConfigError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let public_base_url = or_default("PUBLIC_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        let data_dir = match get("DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir(),
        };

        let store = parse_or("STORE_BACKEND", get("STORE_BACKEND"), StoreBackend::File)?;

        let supabase = SupabaseConfig {
            url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
            anon_key: required("SUPABASE_ANON_KEY")?,
            service_key: get("SUPABASE_SERVICE_ROLE_KEY"),
        };
        if store == StoreBackend::Supabase && supabase.service_key.is_none() {
            return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"));
        }

        let spotify = SpotifyConfig {
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            client_secret: required("SPOTIFY_API_AUTH_CLIENT_SECRET")?,
            redirect_uri: get("SPOTIFY_API_REDIRECT_URI")
                .unwrap_or_else(|| format!("{}/api/auth/spotify/callback", public_base_url)),
            scope: or_default(
                "SPOTIFY_API_AUTH_SCOPE",
                "playlist-modify-public playlist-modify-private",
            ),
            auth_url: or_default(
                "SPOTIFY_API_AUTH_URL",
                "https://accounts.spotify.com/authorize",
            ),
            token_url: or_default(
                "SPOTIFY_API_TOKEN_URL",
                "https://accounts.spotify.com/api/token",
            ),
            api_url: or_default("SPOTIFY_API_URL", "https://api.spotify.com/v1")
                .trim_end_matches('/')
                .to_string(),
            max_retries: parse_or("SPOTIFY_MAX_RETRIES", get("SPOTIFY_MAX_RETRIES"), 2)?,
            max_retry_after: Duration::from_secs(parse_or(
                "SPOTIFY_MAX_RETRY_AFTER_SECS",
                get("SPOTIFY_MAX_RETRY_AFTER_SECS"),
                30,
            )?),
        };

        let gemini = GeminiConfig {
            api_url: or_default(
                "GEMINI_API_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            )
            .trim_end_matches('/')
            .to_string(),
            api_key: required("GOOGLE_AI_API_KEY")?,
            model: or_default("GEMINI_MODEL", "gemini-2.0-flash"),
        };

        let lastfm = LastFmConfig {
            api_url: or_default("LASTFM_API_URL", "https://ws.audioscrobbler.com/2.0/"),
            api_key: required("LASTFM_API_KEY")?,
        };

        let generator = GeneratorConfig {
            max_songs: parse_or("GENERATOR_MAX_SONGS", get("GENERATOR_MAX_SONGS"), 50)?,
            enrich_concurrency: parse_or(
                "GENERATOR_ENRICH_CONCURRENCY",
                get("GENERATOR_ENRICH_CONCURRENCY"),
                8,
            )?
            .max(1),
        };

        Ok(Config {
            server_addr: or_default("SERVER_ADDRESS", "127.0.0.1:3000"),
            public_base_url,
            data_dir,
            store,
            http_timeout: Duration::from_secs(parse_or(
                "HTTP_TIMEOUT_SECS",
                get("HTTP_TIMEOUT_SECS"),
                15,
            )?),
            supabase,
            gemini,
            lastfm,
            spotify,
            generator,
        })
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

/// Returns the per-user data directory, `<local data dir>/sangeetam`.
pub fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sangeetam");
    path
}

/// Loads environment variables from `.env` files.
///
/// A `.env` in the working directory is read first; afterwards the one in
/// the local data directory fills in whatever is still unset. Existing
/// process variables are never overwritten. Missing files are not an error.
///
/// # Directory Structure
///
/// The data directory `.env` is looked up in:
/// - Linux: `~/.local/share/sangeetam/.env`
/// - macOS: `~/Library/Application Support/sangeetam/.env`
/// - Windows: `%LOCALAPPDATA%/sangeetam/.env`
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created or a
/// present `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let dir = default_data_dir();
    async_fs::create_dir_all(&dir)
        .await
        .map_err(|e| e.to_string())?;

    for path in [PathBuf::from(".env"), dir.join(".env")] {
        if path.is_file() {
            dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
        }
    }

    Ok(())
}
