use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use crate::{api::with_session_cookie, server::SpotifyApp, types::AuthQuery};

/// `GET /auth` - sends the browser to Spotify's consent page.
pub async fn auth(
    State(app): State<Arc<SpotifyApp>>,
    headers: HeaderMap,
    Query(query): Query<AuthQuery>,
) -> Response {
    let (session, new_sid) = app.sessions().resolve(&headers).await;

    let response = match app.handshake().begin(&session, query.redirect).await {
        Ok(location) => Redirect::temporary(&location).into_response(),
        Err(e) => {
            error!(error = %e, "failed to build spotify authorize url");
            e.into_response()
        }
    };

    with_session_cookie(response, app.sessions(), new_sid.as_deref())
}
