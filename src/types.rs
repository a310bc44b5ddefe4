use std::{collections::HashMap, fmt};

use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::Res;

/// Credentials of one authorized Spotify user.
///
/// The record is a value: a refresh produces a new record instead of mutating
/// this one, and callers should treat whatever the client hands back as the new
/// source of truth. `expires_at` is an absolute unix timestamp in seconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRecord {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl AuthRecord {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            user_id: None,
        }
    }

    /// Attaches an opaque host identifier, passed back to update listeners.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Seconds left before expiry relative to `now`. Negative once expired.
    pub fn seconds_left(&self, now: i64) -> i64 {
        self.expires_at - now
    }

    /// True when the token expires within `margin` seconds of `now`.
    pub fn expires_within(&self, margin: i64, now: i64) -> bool {
        self.seconds_left(now) <= margin
    }

    /// Builds the successor of this record after a refresh. The refresh token is
    /// only replaced when the provider rotated it.
    pub(crate) fn refreshed(
        &self,
        access_token: String,
        expires_at: i64,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
            expires_at,
            user_id: self.user_id.clone(),
        }
    }
}

impl fmt::Debug for AuthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRecord")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Body of Spotify's token endpoint for both the code and the refresh grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Bytes(Vec<u8>),
    Json(Value),
}

/// Result of an authenticated API call.
#[derive(Debug, Clone)]
pub struct SpotifyResponse {
    /// Whether `auth` differs from the record passed in because it was refreshed.
    pub auth_changed: bool,
    pub auth: AuthRecord,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl SpotifyResponse {
    /// Deserializes the body, whether it was kept raw or already parsed.
    pub fn json<T: DeserializeOwned>(&self) -> Res<T> {
        let value = match &self.body {
            ResponseBody::Json(value) => serde_json::from_value(value.clone())?,
            ResponseBody::Bytes(bytes) => serde_json::from_slice(bytes)?,
        };
        Ok(value)
    }

    pub fn bytes(&self) -> Res<Vec<u8>> {
        match &self.body {
            ResponseBody::Bytes(bytes) => Ok(bytes.clone()),
            ResponseBody::Json(value) => Ok(serde_json::to_vec(value)?),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Per-call options for [`crate::spotify::client::SpotifyClient::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub payload: Option<Payload>,
    pub parse_json: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            payload: None,
            parse_json: false,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn parse_json(mut self) -> Self {
        self.parse_json = true;
        self
    }
}

/// Query of `GET /auth`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthQuery {
    pub redirect: Option<String>,
}

/// Query of `GET /callback`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
