use reqwest::header::HeaderValue;
use sporlauth::config::SpotifyConfig;
use sporlauth::error::SpotifyError;
use sporlauth::types::AuthRecord;
use sporlauth::utils::*;
use std::collections::HashMap;

// Helper function to build a config lookup from key/value pairs
fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

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

    // Should be deterministic - same input produces same output
    assert_eq!(challenge, generate_code_challenge(verifier));

    // Different input should produce different output
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // SHA256 is 32 bytes, 43 characters in base64url without padding
    assert_eq!(challenge.len(), 43);
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_generate_state_token() {
    let state = generate_state_token();

    assert_eq!(state.len(), 43);
    assert!(
        state
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
    assert_ne!(state, generate_state_token());
}

#[test]
fn test_states_match() {
    assert!(states_match(Some("abc"), Some("abc")));

    assert!(!states_match(Some("abc"), Some("abd")));
    assert!(!states_match(Some("abc"), Some("abcd")));
    assert!(!states_match(Some("abc"), Some("ABC")));
    assert!(!states_match(None, Some("abc")));
    assert!(!states_match(Some("abc"), None));
    assert!(!states_match(None, None));
}

#[test]
fn test_is_local_path() {
    assert!(is_local_path("/"));
    assert!(is_local_path("/me"));
    assert!(is_local_path("/me?tab=playlists#top"));

    assert!(!is_local_path(""));
    assert!(!is_local_path("me"));
    assert!(!is_local_path("https://evil.example"));
    assert!(!is_local_path("//evil.example"));
    assert!(!is_local_path("/\\evil.example"));
    assert!(!is_local_path("/me\r\nLocation: x"));
}

#[test]
fn test_parse_retry_after() {
    let value = HeaderValue::from_static("2");
    assert_eq!(parse_retry_after(Some(&value)).unwrap(), 2);

    let padded = HeaderValue::from_static(" 7 ");
    assert_eq!(parse_retry_after(Some(&padded)).unwrap(), 7);

    assert!(matches!(
        parse_retry_after(None),
        Err(SpotifyError::Protocol(_))
    ));

    // HTTP dates and fractions are not accepted
    let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
    assert!(matches!(
        parse_retry_after(Some(&date)),
        Err(SpotifyError::Protocol(_))
    ));
    let fraction = HeaderValue::from_static("1.5");
    assert!(matches!(
        parse_retry_after(Some(&fraction)),
        Err(SpotifyError::Protocol(_))
    ));
}

#[test]
fn test_cookie_value() {
    let header = "theme=dark; sporlauth_sid=abc123; other=1";
    assert_eq!(cookie_value(header, "sporlauth_sid"), Some("abc123"));
    assert_eq!(cookie_value(header, "theme"), Some("dark"));
    assert_eq!(cookie_value(header, "missing"), None);
    assert_eq!(cookie_value("sporlauth_sid=", "sporlauth_sid"), None);
}

#[test]
fn test_auth_record_expiry_boundary() {
    let now = 1_700_000_000;
    let record = AuthRecord::new("access", "refresh", now + 60);

    assert_eq!(record.seconds_left(now), 60);
    assert!(record.expires_within(60, now));
    assert!(!record.expires_within(60, now - 1));
    assert!(record.expires_within(60, now + 120));
}

#[test]
fn test_auth_record_debug_redacts_tokens() {
    let record = AuthRecord::new("secret-access", "secret-refresh", 42).with_user_id("user-1");
    let debug = format!("{:?}", record);

    assert!(!debug.contains("secret-access"));
    assert!(!debug.contains("secret-refresh"));
    assert!(debug.contains("user-1"));
}

#[test]
fn test_auth_record_serde() {
    let record = AuthRecord::new("access", "refresh", 42).with_user_id("user-1");
    let json = serde_json::to_string(&record).unwrap();
    let back: AuthRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(record, back);

    // user_id is optional in stored records
    let stored = r#"{"access_token":"a","refresh_token":"r","expires_at":1}"#;
    let record: AuthRecord = serde_json::from_str(stored).unwrap();
    assert_eq!(record.user_id(), None);
}

#[test]
fn test_config_from_lookup() {
    let config = SpotifyConfig::from_lookup(lookup(&[
        ("SPOTIFY_API_AUTH_CLIENT_ID", "id"),
        ("SPOTIFY_API_AUTH_CLIENT_SECRET", "secret"),
        ("SPOTIFY_API_REDIRECT_URI", "http://localhost:5000/spotify/callback"),
        ("SPOTIFY_API_AUTH_SCOPE", "user-read-email,user-read-private"),
        ("SPOTIFY_USE_PKCE", "true"),
        ("SPOTIFY_MAX_RATE_LIMIT_RETRIES", "3"),
    ]))
    .unwrap();

    assert_eq!(config.client_id, "id");
    assert_eq!(
        config.scope_param().as_deref(),
        Some("user-read-email user-read-private")
    );
    assert!(config.use_pkce);
    assert_eq!(config.max_rate_limit_retries, Some(3));
    assert_eq!(config.api_url, sporlauth::config::SPOTIFY_API_URL);
    assert_eq!(config.default_redirect, None);
}

#[test]
fn test_config_from_lookup_missing_required() {
    let result = SpotifyConfig::from_lookup(lookup(&[("SPOTIFY_API_AUTH_CLIENT_ID", "id")]));

    match result {
        Err(SpotifyError::Config(msg)) => assert!(msg.contains("SPOTIFY_API_AUTH_CLIENT_SECRET")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_config_invalid_retry_limit() {
    let result = SpotifyConfig::from_lookup(lookup(&[
        ("SPOTIFY_API_AUTH_CLIENT_ID", "id"),
        ("SPOTIFY_API_AUTH_CLIENT_SECRET", "secret"),
        ("SPOTIFY_API_REDIRECT_URI", "http://localhost/callback"),
        ("SPOTIFY_MAX_RATE_LIMIT_RETRIES", "many"),
    ]));

    assert!(matches!(result, Err(SpotifyError::Config(_))));
}

#[test]
fn test_public_messages() {
    assert_eq!(SpotifyError::InvalidRequest.public_message(), "Invalid request");
    assert_eq!(
        SpotifyError::CsrfStateMismatch.public_message(),
        "Invalid request"
    );
    assert_eq!(
        SpotifyError::UnhandledAuthorization("access_denied".to_string()).public_message(),
        "access_denied"
    );

    let upstream = SpotifyError::UpstreamAuth {
        status: 400,
        body: "invalid_grant".to_string(),
    };
    assert_eq!(upstream.public_message(), "Authorization failed");
    assert!(upstream.to_string().contains("invalid_grant"));
}
