use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use reqwest::Client;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    Res, api,
    config::{Config, ConfigError, StoreBackend},
    error::AppError,
    generator::PlaylistGenerator,
    management::PendingAuthorizations,
    session::SessionProvider,
    spotify::SpotifyClient,
    storage::{FileStore, PlaylistStore, SupabaseStore, TokenStore},
};

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionProvider,
    pub generator: PlaylistGenerator,
    pub spotify: SpotifyClient,
    pub playlists: Arc<dyn PlaylistStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub pending: PendingAuthorizations,
}

impl AppState {
    /// Wires all components from `config`, with the store backend it selects.
    ///
    /// # Errors
    ///
    /// Fails when the shared HTTP client cannot be built, or when the
    /// Supabase backend is selected without a service-role key.
    pub fn new(config: Config) -> Res<Self> {
        let http = Client::builder().timeout(config.http_timeout).build()?;

        let (playlists, tokens) = match config.store {
            StoreBackend::File => {
                let store = Arc::new(FileStore::new(config.data_dir.clone()));
                shared(store)
            }
            StoreBackend::Supabase => {
                let service_key = config
                    .supabase
                    .service_key
                    .clone()
                    .ok_or(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))?;
                let store = Arc::new(SupabaseStore::new(
                    http.clone(),
                    &config.supabase.url,
                    service_key,
                ));
                shared(store)
            }
        };
        info!(backend = ?config.store, "store ready");

        Ok(Self::with_stores(config, http, playlists, tokens))
    }

    pub fn with_stores(
        config: Config,
        http: Client,
        playlists: Arc<dyn PlaylistStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        AppState {
            sessions: SessionProvider::new(http.clone(), config.supabase.clone()),
            generator: PlaylistGenerator::new(http.clone(), &config),
            spotify: SpotifyClient::new(http, config.spotify.clone()),
            config: Arc::new(config),
            playlists,
            tokens,
            pending: PendingAuthorizations::default(),
        }
    }
}

/// One backend serving both store traits.
fn shared<S>(store: Arc<S>) -> (Arc<dyn PlaylistStore>, Arc<dyn TokenStore>)
where
    S: PlaylistStore + TokenStore + 'static,
{
    (store.clone(), store)
}

/// Routes every endpoint behind the session gate, with request tracing.
///
/// ```no_run
/// # async fn run() -> sangeetam::Res<()> {
/// use sangeetam::{config::Config, server::{AppState, build_router}};
///
/// let state = AppState::new(Config::from_env()?)?;
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```
pub fn build_router(state: AppState) -> Router {
    let spotify_auth = get(api::spotify_auth);

    Router::new()
        .route("/health", get(api::health))
        .route("/auth/signin", post(api::sign_in))
        .route("/auth/signup", post(api::sign_up))
        .route("/api/auth/signout", post(api::sign_out))
        .route("/api/auth/spotify", spotify_auth.clone())
        .route("/api/auth/spotify/callback", spotify_auth)
        .route("/api/generate-playlist", post(api::generate_playlist))
        .route("/api/save-playlist", post(api::save_playlist))
        .route("/api/playlists", get(api::list_playlists))
        .route(
            "/api/playlists/{id}",
            get(api::get_playlist).delete(api::delete_playlist),
        )
        .route("/api/export-playlist", post(api::export_playlist))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

pub async fn start_api_server(state: AppState) -> Res<()> {
    let addr = SocketAddr::from_str(&state.config.server_addr)?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
