//! Configuration for the Spotify authorization flow.
//!
//! A [`SpotifyConfig`] can be assembled in code by the host, or read from
//! environment variables. The environment can be seeded from a `.env` file in
//! the local data directory via [`load_env`]:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Defaults for the public Spotify endpoints

use std::{env, path::PathBuf};

use crate::{Res, error::SpotifyError};

pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:5000";

/// Tokens expiring within this many seconds are refreshed before use.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file is looked up under `sporlauth/.env` in the platform data directory:
/// - Linux: `~/.local/share/sporlauth/.env`
/// - macOS: `~/Library/Application Support/sporlauth/.env`
/// - Windows: `%LOCALAPPDATA%/sporlauth/.env`
///
/// A missing file is not an error; variables may come from the process
/// environment alone.
pub async fn load_env() -> Res<()> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sporlauth/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| SpotifyError::Config(e.to_string()))?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| SpotifyError::Config(e.to_string()))?;
    }
    Ok(())
}

/// Returns the address the demo host binds to (`SERVER_ADDRESS`).
pub fn server_addr() -> String {
    env::var("SERVER_ADDRESS").unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.to_string())
}

/// Settings shared by the handshake and the request executor.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with Spotify; must point at the mounted `/callback`.
    pub redirect_uri: String,
    pub scope: Option<Vec<String>>,
    /// Where to send the browser after login when `/auth` got no `redirect`.
    pub default_redirect: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    /// Send a PKCE challenge along with the client secret.
    pub use_pkce: bool,
    /// Force the consent dialog even for users who already approved the app.
    pub show_dialog: bool,
    /// `None` keeps retrying on 429 for as long as Spotify asks.
    pub max_rate_limit_retries: Option<u32>,
}

impl SpotifyConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scope: None,
            default_redirect: None,
            auth_url: SPOTIFY_AUTH_URL.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            api_url: SPOTIFY_API_URL.to_string(),
            use_pkce: false,
            show_dialog: false,
            max_rate_limit_retries: None,
        }
    }

    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = Some(scope.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default_redirect(mut self, target: impl Into<String>) -> Self {
        self.default_redirect = Some(target.into());
        self
    }

    /// Points all three Spotify endpoints somewhere else, e.g. a mock server.
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.api_url = api_url.into();
        self
    }

    pub fn with_pkce(mut self, enabled: bool) -> Self {
        self.use_pkce = enabled;
        self
    }

    pub fn with_max_rate_limit_retries(mut self, retries: u32) -> Self {
        self.max_rate_limit_retries = Some(retries);
        self
    }

    /// Space separated scope as sent to the authorize endpoint.
    pub fn scope_param(&self) -> Option<String> {
        self.scope
            .as_ref()
            .filter(|scope| !scope.is_empty())
            .map(|scope| scope.join(" "))
    }

    /// Reads the configuration from process environment variables.
    ///
    /// Required: `SPOTIFY_API_AUTH_CLIENT_ID`, `SPOTIFY_API_AUTH_CLIENT_SECRET`,
    /// `SPOTIFY_API_REDIRECT_URI`. Optional: `SPOTIFY_API_AUTH_SCOPE`,
    /// `SPOTIFY_API_AUTH_URL`, `SPOTIFY_API_TOKEN_URL`, `SPOTIFY_API_URL`,
    /// `SPOTIFY_DEFAULT_REDIRECT`, `SPOTIFY_USE_PKCE`, `SPOTIFY_SHOW_DIALOG`,
    /// `SPOTIFY_MAX_RATE_LIMIT_RETRIES`.
    pub fn from_env() -> Res<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`SpotifyConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Res<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SpotifyError::Config(format!("{key} must be set")))
        };
        let flag = |key: &str| {
            lookup(key).is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        };

        let mut config = Self::new(
            required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            required("SPOTIFY_API_AUTH_CLIENT_SECRET")?,
            required("SPOTIFY_API_REDIRECT_URI")?,
        );

        if let Some(scope) = lookup("SPOTIFY_API_AUTH_SCOPE") {
            // accept both "a b" and "a,b"
            config.scope = Some(
                scope
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(url) = lookup("SPOTIFY_API_AUTH_URL") {
            config.auth_url = url;
        }
        if let Some(url) = lookup("SPOTIFY_API_TOKEN_URL") {
            config.token_url = url;
        }
        if let Some(url) = lookup("SPOTIFY_API_URL") {
            config.api_url = url;
        }
        config.default_redirect = lookup("SPOTIFY_DEFAULT_REDIRECT");
        config.use_pkce = flag("SPOTIFY_USE_PKCE");
        config.show_dialog = flag("SPOTIFY_SHOW_DIALOG");

        if let Some(retries) = lookup("SPOTIFY_MAX_RATE_LIMIT_RETRIES") {
            let retries = retries.parse::<u32>().map_err(|e| {
                SpotifyError::Config(format!("SPOTIFY_MAX_RATE_LIMIT_RETRIES: {e}"))
            })?;
            config.max_rate_limit_retries = Some(retries);
        }

        Ok(config)
    }
}
