//! Sangeetam Library
//!
//! An HTTP service that turns natural-language prompts into playlists,
//! enriches them with album art, stores them per user and exports them to
//! Spotify.
//!
//! # Modules
//!
//! - `api` - HTTP handlers and the session gate
//! - `config` - Configuration from the environment
//! - `error` - Error type rendered at the HTTP boundary
//! - `export` - Playlist export to external platforms
//! - `generator` - LLM playlist generation and album-art enrichment
//! - `management` - Spotify token lifecycle and pending authorizations
//! - `server` - Shared state, router and server start-up
//! - `session` - Auth provider client
//! - `spotify` - Spotify Web API client implementation
//! - `storage` - Playlist and token persistence
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use sangeetam::{config::{self, Config}, server};
//!
//! #[tokio::main]
//! async fn main() -> sangeetam::Res<()> {
//!     config::load_env().await?;
//!     let state = server::AppState::new(Config::from_env()?)?;
//!     server::start_api_server(state).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod management;
pub mod server;
pub mod session;
pub mod spotify;
pub mod storage;
pub mod types;
pub mod utils;

/// A convenient Result type alias for top-level plumbing.
///
/// Boxes any error that is `Send + Sync`, so start-up code can use `?` on
/// configuration, client and I/O errors alike.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```ignore
/// info!("Listening on {}", addr);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal start-up errors; code after it does not run.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
