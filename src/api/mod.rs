//! # API Module
//!
//! HTTP handlers of the Sangeetam service, built on [Axum](https://docs.rs/axum).
//!
//! ## Endpoints
//!
//! ### Session
//!
//! - [`session_gate`] - middleware in front of every route. Resolves the
//!   session from the `sb-access-token` cookie or a bearer token, redirects
//!   pages to sign-in and keeps signed-in users away from the auth pages.
//! - [`sign_in`], [`sign_up`], [`sign_out`] - account operations proxied to
//!   the auth provider; sign-in sets the session cookie.
//!
//! ### Playlists
//!
//! - [`generate_playlist`] - prompt in, enriched song list out.
//! - [`save_playlist`], [`list_playlists`], [`get_playlist`],
//!   [`delete_playlist`] - the caller's saved playlists. Playlists of other
//!   users are reported as not found.
//! - [`export_playlist`] - recreates a playlist on Spotify.
//!
//! ### Spotify connection
//!
//! - [`spotify_auth`] - starts the OAuth authorization code flow (PKCE) and
//!   handles its callback.
//!
//! ### Monitoring
//!
//! - [`health`] - status and version, reachable without a session.
//!
//! ## Errors
//!
//! Handlers return [`crate::error::ApiResult`]; failures are rendered as
//! `{"error": "<message>"}` with the matching status code.

mod account;
mod export;
mod gate;
mod generate;
mod health;
mod playlists;
mod spotify_auth;

pub use account::{sign_in, sign_out, sign_up};
pub use export::export_playlist;
pub use gate::{SESSION_COOKIE, SIGN_IN_PATH, session_gate};
pub use generate::generate_playlist;
pub use health::health;
pub use playlists::{delete_playlist, get_playlist, list_playlists, save_playlist};
pub use spotify_auth::spotify_auth;
