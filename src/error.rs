//! Error types for the authorization handshake and the authenticated request path.
//!
//! Every failure the crate can produce is a variant of [`SpotifyError`]. Variants
//! carry the upstream detail (status code and body) so operators can diagnose a
//! failed exchange, while [`SpotifyError::public_message`] yields the generalized
//! text that is safe to show to the end user.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Message shown to the user for malformed callbacks and CSRF failures alike.
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request";

/// Message shown to the user when the token endpoint rejected the exchange.
pub const AUTHORIZATION_FAILED_MESSAGE: &str = "Authorization failed";

#[derive(Debug, Error)]
pub enum SpotifyError {
    /// The callback was missing a required parameter.
    #[error("invalid authorization request")]
    InvalidRequest,

    /// The returned `state` did not match the one stored for the session, or one
    /// of the two was absent.
    #[error("authorization state mismatch")]
    CsrfStateMismatch,

    /// Spotify reported an authorization error and the host registered no error hook.
    #[error("Unhandled authorization error {0}")]
    UnhandledAuthorization(String),

    /// The token endpoint answered with a non-2xx status.
    #[error("token endpoint returned {status}: {body}")]
    UpstreamAuth { status: u16, body: String },

    /// An API endpoint answered with a non-2xx status other than 429.
    #[error("api endpoint returned {status}: {body}")]
    UpstreamApi { status: u16, body: String },

    /// The provider answered in a shape we cannot act on, e.g. a 429 without a
    /// usable `Retry-After`.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The configured rate limit retry budget was used up.
    #[error("still rate limited after {attempts} retries")]
    RateLimited { attempts: u32 },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// Raised by host code persisting a record (update listener or `handle_auth`).
    #[error("failed to persist authorization: {0}")]
    Persistence(String),
}

impl SpotifyError {
    /// Generalized text for end users. Upstream detail stays in logs.
    pub fn public_message(&self) -> String {
        match self {
            SpotifyError::InvalidRequest | SpotifyError::CsrfStateMismatch => {
                INVALID_REQUEST_MESSAGE.to_string()
            }
            SpotifyError::UnhandledAuthorization(error) => error.clone(),
            _ => AUTHORIZATION_FAILED_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for SpotifyError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled authorization error {}", self.public_message()),
        )
            .into_response()
    }
}
