use axum::http::{HeaderMap, HeaderValue, header};
use sangeetam::types::{Platform, Song};
use sangeetam::utils::*;

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // Should be exactly 128 characters
    assert_eq!(verifier.len(), 128);

    // Should contain only alphanumeric characters
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated verifiers should be different
    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    assert!(!challenge.is_empty());

    // Deterministic for the same input
    assert_eq!(challenge, generate_code_challenge(verifier));
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // URL-safe base64 without padding
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_generate_code_challenge_known_vector() {
    // RFC 7636 appendix B
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    assert_eq!(
        generate_code_challenge(verifier),
        "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    );
}

#[test]
fn test_generate_state_is_unique() {
    let a = generate_state();
    let b = generate_state();
    assert_eq!(a.len(), 32);
    assert_ne!(a, b);
}

#[test]
fn test_strip_code_fences() {
    let fenced = "```json\n[{\"title\": \"A\", \"artist\": \"B\"}]\n```";
    assert_eq!(
        strip_code_fences(fenced),
        "[{\"title\": \"A\", \"artist\": \"B\"}]"
    );

    // Plain input is only trimmed
    assert_eq!(strip_code_fences("  [] \n"), "[]");
}

#[test]
fn test_extract_json_array() {
    let text = "Here you go: [{\"title\": \"A\"}] enjoy!";
    assert_eq!(extract_json_array(text), "[{\"title\": \"A\"}]");

    // Without brackets the input is returned unchanged
    assert_eq!(extract_json_array("no json"), "no json");
    assert_eq!(extract_json_array("] backwards ["), "] backwards [");
}

#[test]
fn test_spotify_track_uri() {
    assert_eq!(spotify_track_uri("abc123"), "spotify:track:abc123");
    assert_eq!(
        spotify_track_uri("spotify:track:abc123"),
        "spotify:track:abc123"
    );
}

#[test]
fn test_cookie_value() {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("theme=dark; sb-access-token=tok123; other=1"),
    );

    assert_eq!(
        cookie_value(&headers, "sb-access-token"),
        Some("tok123".to_string())
    );
    assert_eq!(cookie_value(&headers, "missing"), None);
}

#[test]
fn test_bearer_token() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert_eq!(bearer_token(&headers), Some("abc".to_string()));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert_eq!(bearer_token(&headers), None);
}

#[test]
fn test_song_accepts_snake_case_aliases() {
    let song: Song = serde_json::from_str(
        r#"{"title": "Song", "artist": "Artist", "album_art": "http://img", "spotify_id": "xyz"}"#,
    )
    .unwrap();

    assert_eq!(song.album_art.as_deref(), Some("http://img"));
    assert_eq!(song.spotify_id.as_deref(), Some("xyz"));
}

#[test]
fn test_song_always_serializes_album_art() {
    let song = Song::new("Song", "Artist");
    let value = serde_json::to_value(&song).unwrap();

    assert!(value.get("albumArt").unwrap().is_null());
    assert!(value.get("spotifyId").is_none());
}

#[test]
fn test_platform_from_str() {
    assert_eq!("spotify".parse::<Platform>(), Ok(Platform::Spotify));
    assert_eq!("apple".parse::<Platform>(), Ok(Platform::Apple));
    assert_eq!("tidal".parse::<Platform>(), Ok(Platform::Tidal));
    assert!("deezer".parse::<Platform>().is_err());
}
