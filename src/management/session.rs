use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::http::{HeaderMap, header::COOKIE};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};

use crate::utils;

/// Name of the cookie carrying the session id issued by [`SessionRegistry`].
pub const SESSION_COOKIE: &str = "sporlauth_sid";

pub const KEY_STATE: &str = "spotify_state";
pub const KEY_TARGET_URL: &str = "spotify_target_url";
pub const KEY_CODE_VERIFIER: &str = "spotify_code_verifier";

/// Per-browser scratch storage used by the handshake.
///
/// Any backend (signed cookie, server side store, database) can implement this.
/// `pop` must remove the value it returns so a state token is read only once.
#[async_trait]
pub trait Session: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String);
    async fn pop(&self, key: &str) -> Option<String>;
}

/// In-memory [`Session`]. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn get(&self, key: &str) -> Option<String> {
        self.values.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) {
        self.values.lock().await.insert(key.to_string(), value);
    }

    async fn pop(&self, key: &str) -> Option<String> {
        self.values.lock().await.remove(key)
    }
}

/// How long an untouched session stays in a [`SessionRegistry`].
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct Entry {
    session: MemorySession,
    touched: Instant,
}

/// Cookie keyed registry of [`MemorySession`]s backing the bundled router.
///
/// Sessions idle for longer than the TTL are evicted whenever a new one is
/// issued. The id is rotated once a login completes, see [`SessionRegistry::rotate`].
/// Hosts serving over HTTPS should enable [`SessionRegistry::with_secure_cookies`].
///
/// Hosts that need sessions to survive restarts or span several instances should
/// drive [`crate::api::handshake::Handshake`] with their own [`Session`] instead.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
    secure: bool,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self {
            sessions: Arc::default(),
            ttl: DEFAULT_SESSION_TTL,
            secure: false,
        }
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Adds the `Secure` attribute to issued cookies.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Returns the live session named by the request's cookie without creating one.
    pub async fn lookup(&self, headers: &HeaderMap) -> Option<(String, MemorySession)> {
        let sid = session_id(headers)?;
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();

        let entry = sessions.get_mut(&sid)?;
        if now.duration_since(entry.touched) > self.ttl {
            sessions.remove(&sid);
            return None;
        }

        entry.touched = now;
        let session = entry.session.clone();
        Some((sid, session))
    }

    /// Returns the session named by the request's cookie, creating a new one when
    /// the cookie is missing, unknown or expired. The second value is the fresh
    /// session id that must be handed to the browser, if one was created.
    pub async fn resolve(&self, headers: &HeaderMap) -> (MemorySession, Option<String>) {
        if let Some((_, session)) = self.lookup(headers).await {
            return (session, None);
        }

        let session = MemorySession::new();
        let sid = self.insert(session.clone()).await;
        (session, Some(sid))
    }

    /// Moves the session under a new id and forgets the old one. Returns the new
    /// id, or `None` when `sid` is not registered.
    pub async fn rotate(&self, sid: &str) -> Option<String> {
        let entry = self.sessions.write().await.remove(sid)?;
        Some(self.insert(entry.session).await)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// `Set-Cookie` value for a freshly issued session id.
    pub fn cookie(&self, sid: &str) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax{secure}")
    }

    async fn insert(&self, session: MemorySession) -> String {
        let sid = utils::generate_state_token();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        sessions.retain(|_, entry| now.duration_since(entry.touched) <= self.ttl);
        sessions.insert(
            sid.clone(),
            Entry {
                session,
                touched: now,
            },
        );
        sid
    }
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| utils::cookie_value(raw, SESSION_COOKIE))
        .map(str::to_string)
}
