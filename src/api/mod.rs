//! # API Module
//!
//! HTTP endpoints the host mounts into its axum router, plus the framework
//! independent handshake they are built on.
//!
//! ## Endpoints
//!
//! - [`auth`] - `GET /auth?redirect=<target>`: stores a state token in the browser
//!   session and answers with a 307 to Spotify's consent page.
//! - [`callback`] - `GET /callback?code&state&error`: validates the state, exchanges
//!   the code for an [`crate::types::AuthRecord`] and runs the [`AuthHooks`].
//! - [`health`] - `GET /health`: status and version for monitoring.
//!
//! ## Sessions
//!
//! The bundled handlers keep handshake scratch data in
//! [`crate::management::SessionRegistry`], keyed by the `sporlauth_sid` cookie.
//! `/callback` never issues a session: a browser arriving without a known cookie
//! cannot hold a pending state, so it fails closed on a throwaway session. A
//! completed login moves the session to a new id.
//! Hosts with their own session backend can call [`handshake::Handshake`]
//! directly with any [`crate::management::Session`].
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use axum::Router;
//! use sporlauth::{config::SpotifyConfig, server::{SpotifyApp, router}};
//!
//! let app = Arc::new(SpotifyApp::new(SpotifyConfig::from_env()?));
//! let host = Router::new().nest("/spotify", router(app));
//! ```

mod auth;
mod callback;
pub mod handshake;
mod health;
mod hooks;

use axum::{
    http::{HeaderValue, header::SET_COOKIE},
    response::Response,
};

pub use auth::auth;
pub use callback::callback;
pub use health::health;
pub use hooks::{AuthHooks, DefaultHooks, KEY_AUTH, SessionAuthHooks, load_auth, store_auth};

use crate::management::SessionRegistry;

/// Hands a freshly issued session id to the browser.
pub fn with_session_cookie(
    mut response: Response,
    sessions: &SessionRegistry,
    new_sid: Option<&str>,
) -> Response {
    if let Some(sid) = new_sid {
        if let Ok(value) = HeaderValue::from_str(&sessions.cookie(sid)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}
