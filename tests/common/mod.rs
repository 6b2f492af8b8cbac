#![allow(dead_code)]

//! Fake upstream services for integration tests.
//!
//! One axum server on an ephemeral port plays the Supabase auth API, Gemini,
//! Last.fm and the Spotify accounts and Web APIs. Every call is recorded as
//! `"<METHOD> <path>"` so tests can assert on what reached the outside world.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;

use sangeetam::{
    config::Config,
    server::{AppState, build_router},
    storage::FileStore,
};

pub const USER_TOKEN: &str = "good-token";
pub const OTHER_USER_TOKEN: &str = "other-token";
pub const USER_ID: &str = "user-1";
pub const OTHER_USER_ID: &str = "user-2";

pub const AUTH_CODE: &str = "good-code";
pub const SPOTIFY_ACCESS: &str = "sp-access";
pub const SPOTIFY_REFRESHED: &str = "sp-access-2";
pub const SPOTIFY_REFRESH: &str = "sp-refresh";
pub const REVOKED_REFRESH: &str = "revoked";

pub const PUBLIC_BASE_URL: &str = "http://app.test";

/// A canned failure answered instead of the normal Spotify response.
#[derive(Clone, Copy, Debug)]
pub enum Fault {
    /// `429` with the given `Retry-After` seconds.
    Throttle(u64),
    BadGateway,
    Unauthorized,
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        match self {
            Fault::Throttle(secs) => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, secs.to_string())],
            )
                .into_response(),
            Fault::BadGateway => StatusCode::BAD_GATEWAY.into_response(),
            Fault::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

#[derive(Default)]
pub struct Upstream {
    pub calls: Mutex<Vec<String>>,
    pub gemini_text: Mutex<String>,
    pub fail_add_tracks: Mutex<bool>,
    pub search_faults: Mutex<VecDeque<Fault>>,
    pub create_faults: Mutex<VecDeque<Fault>>,
    pub add_faults: Mutex<VecDeque<Fault>>,
    pub added_uris: Mutex<Vec<Vec<String>>>,
    pub created_playlists: Mutex<Vec<Value>>,
}

impl Upstream {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(prefix))
            .collect()
    }

    pub fn set_gemini_text(&self, text: &str) {
        *self.gemini_text.lock().unwrap() = text.to_string();
    }

    pub fn fail_add_tracks(&self) {
        *self.fail_add_tracks.lock().unwrap() = true;
    }

    /// Queues faults answered, in order, by the next searches.
    pub fn fail_searches(&self, faults: &[Fault]) {
        self.search_faults.lock().unwrap().extend(faults);
    }

    pub fn fail_creates(&self, faults: &[Fault]) {
        self.create_faults.lock().unwrap().extend(faults);
    }

    pub fn fail_adds(&self, faults: &[Fault]) {
        self.add_faults.lock().unwrap().extend(faults);
    }
}

fn next_fault(queue: &Mutex<VecDeque<Fault>>) -> Option<Fault> {
    queue.lock().unwrap().pop_front()
}

type Shared = Arc<Upstream>;

async fn record(State(upstream): State<Shared>, request: Request, next: Next) -> Response {
    upstream
        .calls
        .lock()
        .unwrap()
        .push(format!("{} {}", request.method(), request.uri().path()));
    next.run(request).await
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

// --- supabase auth ---

async fn supabase_user(headers: HeaderMap) -> Response {
    match bearer(&headers).as_deref() {
        Some(USER_TOKEN) => {
            Json(json!({ "id": USER_ID, "email": "one@example.com" })).into_response()
        }
        Some(OTHER_USER_TOKEN) => {
            Json(json!({ "id": OTHER_USER_ID, "email": "two@example.com" })).into_response()
        }
        Some("explode") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn supabase_token(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret" {
        Json(json!({
            "access_token": USER_TOKEN,
            "refresh_token": "sb-refresh",
            "expires_in": 3600,
            "user": { "id": USER_ID, "email": body["email"] }
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response()
    }
}

async fn supabase_logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

// --- gemini ---

async fn gemini(State(upstream): State<Shared>, Path(_call): Path<String>) -> Json<Value> {
    let text = upstream.gemini_text.lock().unwrap().clone();
    Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
}

// --- last.fm ---

async fn lastfm(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let track = params.get("track").cloned().unwrap_or_default();
    if track == "Slow" {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    if track == "No Art" {
        return Json(json!({ "error": 6, "message": "Track not found" }));
    }

    Json(json!({
        "track": {
            "name": track,
            "album": {
                "image": [
                    { "#text": format!("https://img.test/{}-s.png", track), "size": "small" },
                    { "#text": format!("https://img.test/{}-xl.png", track), "size": "extralarge" },
                    { "#text": "", "size": "mega" }
                ]
            }
        }
    }))
}

// --- spotify ---

async fn spotify_token(Form(form): Form<HashMap<String, String>>) -> Response {
    let grant = form.get("grant_type").map(String::as_str);
    match grant {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some(AUTH_CODE) => {
            Json(json!({
                "access_token": SPOTIFY_ACCESS,
                "refresh_token": SPOTIFY_REFRESH,
                "scope": "playlist-modify-private",
                "expires_in": 3600
            }))
            .into_response()
        }
        Some("refresh_token")
            if form.get("refresh_token").map(String::as_str) == Some(SPOTIFY_REFRESH) =>
        {
            Json(json!({ "access_token": SPOTIFY_REFRESHED, "expires_in": 3600 })).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
    }
}

fn spotify_authorized(headers: &HeaderMap) -> bool {
    matches!(
        bearer(headers).as_deref(),
        Some(SPOTIFY_ACCESS) | Some(SPOTIFY_REFRESHED)
    )
}

async fn spotify_create_playlist(
    State(upstream): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !spotify_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if let Some(fault) = next_fault(&upstream.create_faults) {
        return fault.into_response();
    }
    upstream.created_playlists.lock().unwrap().push(body.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "id": "pl-1", "name": body["name"] })),
    )
        .into_response()
}

async fn spotify_search(
    State(upstream): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !spotify_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if let Some(fault) = next_fault(&upstream.search_faults) {
        return fault.into_response();
    }
    let q = params.get("q").cloned().unwrap_or_default();
    if q.contains("Broken") {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let items = if q.contains("Missing") {
        json!([])
    } else {
        let id: String = q.chars().filter(char::is_ascii_alphanumeric).collect();
        json!([{ "id": id, "name": q, "uri": format!("spotify:track:{}", id) }])
    };
    Json(json!({ "tracks": { "items": items } })).into_response()
}

async fn spotify_add_tracks(
    State(upstream): State<Shared>,
    headers: HeaderMap,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !spotify_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if let Some(fault) = next_fault(&upstream.add_faults) {
        return fault.into_response();
    }
    if *upstream.fail_add_tracks.lock().unwrap() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let uris = body["uris"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|u| u.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    upstream.added_uris.lock().unwrap().push(uris);
    (StatusCode::CREATED, Json(json!({ "snapshot_id": "snap-1" }))).into_response()
}

async fn spotify_unfollow(Path(_id): Path<String>) -> StatusCode {
    StatusCode::OK
}

/// Starts the fake upstream and returns its base URL.
pub async fn spawn_upstream(upstream: Shared) -> String {
    let app = Router::new()
        .route("/supabase/auth/v1/user", get(supabase_user))
        .route("/supabase/auth/v1/token", post(supabase_token))
        .route("/supabase/auth/v1/logout", post(supabase_logout))
        .route("/gemini/models/{call}", post(gemini))
        .route("/lastfm/", get(lastfm))
        .route("/spotify/token", post(spotify_token))
        .route("/spotify/api/search", get(spotify_search))
        .route("/spotify/api/me/playlists", post(spotify_create_playlist))
        .route("/spotify/api/playlists/{id}/tracks", post(spotify_add_tracks))
        .route(
            "/spotify/api/playlists/{id}/followers",
            delete(spotify_unfollow),
        )
        .layer(middleware::from_fn_with_state(upstream.clone(), record))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn test_config(base: &str, data_dir: &std::path::Path) -> Config {
    let env: HashMap<&str, String> = HashMap::from([
        ("PUBLIC_BASE_URL", PUBLIC_BASE_URL.to_string()),
        ("DATA_DIR", data_dir.display().to_string()),
        ("STORE_BACKEND", "file".to_string()),
        ("HTTP_TIMEOUT_SECS", "5".to_string()),
        ("SUPABASE_URL", format!("{}/supabase", base)),
        ("SUPABASE_ANON_KEY", "anon".to_string()),
        ("GOOGLE_AI_API_KEY", "gemini-key".to_string()),
        ("GEMINI_API_URL", format!("{}/gemini", base)),
        ("LASTFM_API_KEY", "lastfm-key".to_string()),
        ("LASTFM_API_URL", format!("{}/lastfm/", base)),
        ("SPOTIFY_API_AUTH_CLIENT_ID", "client-id".to_string()),
        ("SPOTIFY_API_AUTH_CLIENT_SECRET", "client-secret".to_string()),
        ("SPOTIFY_API_TOKEN_URL", format!("{}/spotify/token", base)),
        ("SPOTIFY_API_URL", format!("{}/spotify/api", base)),
        ("GENERATOR_MAX_SONGS", "10".to_string()),
    ]);

    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub upstream: Shared,
    pub store: Arc<FileStore>,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let upstream = Arc::new(Upstream::default());
        let base = spawn_upstream(upstream.clone()).await;
        let dir = tempfile::tempdir().unwrap();

        let config = test_config(&base, dir.path());
        let store = Arc::new(FileStore::new(dir.path()));
        let state = AppState::with_stores(
            config,
            reqwest::Client::new(),
            store.clone(),
            store.clone(),
        );

        TestApp {
            router: build_router(state.clone()),
            upstream,
            store,
            state,
            _dir: dir,
        }
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("theme=dark; sb-access-token={}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}
