use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};

use crate::{
    api::with_session_cookie, management::MemorySession, server::SpotifyApp,
    types::CallbackParams,
};

/// `GET /callback` - finishes the handshake Spotify redirected back to.
pub async fn callback(
    State(app): State<Arc<SpotifyApp>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    // unknown browsers get a throwaway session, which has no state to match
    let known = app.sessions().lookup(&headers).await;
    let session = known
        .as_ref()
        .map(|(_, session)| session.clone())
        .unwrap_or_else(MemorySession::new);

    let outcome = match app.handshake().complete(&session, params).await {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };

    let rotated = match known {
        Some((sid, _)) if outcome.is_authorized() => app.sessions().rotate(&sid).await,
        _ => None,
    };

    with_session_cookie(outcome.into_response(), app.sessions(), rotated.as_deref())
}
