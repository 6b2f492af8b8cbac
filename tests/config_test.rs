use std::{collections::HashMap, time::Duration};

use sangeetam::config::{Config, ConfigError, StoreBackend};

fn required() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("SUPABASE_URL", "https://project.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("GOOGLE_AI_API_KEY", "gemini"),
        ("LASTFM_API_KEY", "lastfm"),
        ("SPOTIFY_API_AUTH_CLIENT_ID", "client-id"),
        ("SPOTIFY_API_AUTH_CLIENT_SECRET", "client-secret"),
    ])
}

fn load(env: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
    Config::from_lookup(|key| env.get(key).map(|v| v.to_string()))
}

#[test]
fn defaults_apply_when_only_required_keys_are_set() {
    let config = load(&required()).unwrap();

    assert_eq!(config.server_addr, "127.0.0.1:3000");
    assert_eq!(config.public_base_url, "http://localhost:3000");
    assert_eq!(config.store, StoreBackend::File);
    assert_eq!(config.http_timeout, Duration::from_secs(15));
    assert_eq!(config.supabase.url, "https://project.supabase.co");
    assert_eq!(config.gemini.model, "gemini-2.0-flash");
    assert_eq!(
        config.spotify.redirect_uri,
        "http://localhost:3000/api/auth/spotify/callback"
    );
    assert_eq!(
        config.spotify.scope,
        "playlist-modify-public playlist-modify-private"
    );
    assert_eq!(config.spotify.max_retries, 2);
    assert_eq!(config.spotify.max_retry_after, Duration::from_secs(30));
    assert_eq!(config.generator.max_songs, 50);
    assert_eq!(config.generator.enrich_concurrency, 8);
    assert!(config.data_dir.ends_with("sangeetam"));
}

#[test]
fn missing_required_key_is_reported() {
    let mut env = required();
    env.remove("GOOGLE_AI_API_KEY");

    assert!(matches!(
        load(&env),
        Err(ConfigError::Missing("GOOGLE_AI_API_KEY"))
    ));
}

#[test]
fn empty_values_count_as_unset() {
    let mut env = required();
    env.insert("LASTFM_API_KEY", "  ");

    assert!(matches!(
        load(&env),
        Err(ConfigError::Missing("LASTFM_API_KEY"))
    ));
}

#[test]
fn supabase_backend_needs_the_service_key() {
    let mut env = required();
    env.insert("STORE_BACKEND", "supabase");
    assert!(matches!(
        load(&env),
        Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))
    ));

    env.insert("SUPABASE_SERVICE_ROLE_KEY", "service");
    let config = load(&env).unwrap();
    assert_eq!(config.store, StoreBackend::Supabase);
    assert_eq!(config.supabase.service_key.as_deref(), Some("service"));
}

#[test]
fn redirect_uri_follows_public_base_url() {
    let mut env = required();
    env.insert("PUBLIC_BASE_URL", "https://sangeetam.example/");

    let config = load(&env).unwrap();
    assert_eq!(config.public_base_url, "https://sangeetam.example");
    assert_eq!(
        config.spotify.redirect_uri,
        "https://sangeetam.example/api/auth/spotify/callback"
    );
}

#[test]
fn invalid_numbers_are_rejected() {
    let mut env = required();
    env.insert("GENERATOR_MAX_SONGS", "many");

    match load(&env) {
        Err(ConfigError::Invalid { key, value }) => {
            assert_eq!(key, "GENERATOR_MAX_SONGS");
            assert_eq!(value, "many");
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}
