use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use reqwest::header::HeaderValue;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{Res, error::SpotifyError};

/// Number of random bytes behind a state token or session id.
const TOKEN_BYTES: usize = 32;

/// Current unix time in seconds.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Random URL-safe token for the OAuth `state` parameter and session ids.
pub fn generate_state_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Exact comparison of the stored and the returned state. Either side missing
/// counts as a mismatch.
pub fn states_match(stored: Option<&str>, returned: Option<&str>) -> bool {
    match (stored, returned) {
        (Some(stored), Some(returned)) => stored.as_bytes().ct_eq(returned.as_bytes()).into(),
        _ => false,
    }
}

/// Reads `Retry-After` as a whole number of seconds.
pub fn parse_retry_after(value: Option<&HeaderValue>) -> Res<u64> {
    let Some(value) = value else {
        return Err(SpotifyError::Protocol(
            "429 response without Retry-After header".to_string(),
        ));
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            SpotifyError::Protocol(format!("invalid Retry-After header: {:?}", value))
        })
}

/// Picks the value of cookie `name` out of a raw `Cookie` header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Whether `target` is a path on the current origin, e.g. `/me?tab=1`.
///
/// Rejects absolute URLs and the protocol relative forms `//host` and `/\host`
/// browsers resolve to another origin.
pub fn is_local_path(target: &str) -> bool {
    let mut chars = target.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/') | Some('\\'))
        && !target.chars().any(char::is_control)
}
