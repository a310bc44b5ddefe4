use async_trait::async_trait;
use axum::response::Response;

use crate::{Res, error::SpotifyError, management::Session, types::AuthRecord};

/// Session key under which [`SessionAuthHooks`] keeps the serialized record.
pub const KEY_AUTH: &str = "spotify_auth";

/// Host extension points of the authorization handshake.
///
/// Every method has a default, so a host only overrides what it needs:
/// - `handle_auth` persists the new record. An error aborts the handshake.
/// - `on_success` renders the response after a successful login. `None` falls
///   back to redirecting to the stored target or the configured default.
/// - `on_error` renders a failed login. `None` turns the failure into a 500.
#[async_trait]
pub trait AuthHooks: Send + Sync {
    async fn handle_auth(&self, _session: &dyn Session, _record: &AuthRecord) -> Res<()> {
        Ok(())
    }

    async fn on_success(&self, _session: &dyn Session, _record: &AuthRecord) -> Option<Response> {
        None
    }

    async fn on_error(&self, _session: &dyn Session, _message: &str) -> Option<Response> {
        None
    }
}

/// Hooks that do nothing beyond the default behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl AuthHooks for DefaultHooks {}

/// Keeps the record in the browser session under [`KEY_AUTH`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAuthHooks;

#[async_trait]
impl AuthHooks for SessionAuthHooks {
    async fn handle_auth(&self, session: &dyn Session, record: &AuthRecord) -> Res<()> {
        store_auth(session, record).await
    }
}

pub async fn store_auth(session: &dyn Session, record: &AuthRecord) -> Res<()> {
    let json = serde_json::to_string(record).map_err(|e| SpotifyError::Persistence(e.to_string()))?;
    session.set(KEY_AUTH, json).await;
    Ok(())
}

pub async fn load_auth(session: &dyn Session) -> Res<Option<AuthRecord>> {
    match session.get(KEY_AUTH).await {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
