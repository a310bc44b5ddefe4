use std::sync::Arc;

use axum::response::{IntoResponse, Redirect, Response};
use tracing::{error, info, warn};

use crate::{
    Res,
    api::AuthHooks,
    error::SpotifyError,
    management::{KEY_CODE_VERIFIER, KEY_STATE, KEY_TARGET_URL, Session},
    spotify::{SpotifyClient, auth},
    types::{AuthRecord, CallbackParams},
    utils,
};

/// Where a completed callback sends the browser.
pub enum CallbackOutcome {
    /// The success hook rendered the response.
    Response(Response),
    /// The error hook rendered the response for a failed callback.
    Rejected(Response),
    /// Redirect to the stored target or the configured default.
    Redirect(String),
    /// Logged in, nowhere to go.
    Authorized,
}

impl IntoResponse for CallbackOutcome {
    fn into_response(self) -> Response {
        match self {
            CallbackOutcome::Response(response) | CallbackOutcome::Rejected(response) => {
                response
            }
            CallbackOutcome::Redirect(target) => Redirect::temporary(&target).into_response(),
            CallbackOutcome::Authorized => "authorized".into_response(),
        }
    }
}

impl CallbackOutcome {
    /// Whether the callback ended in a stored login.
    pub fn is_authorized(&self) -> bool {
        !matches!(self, CallbackOutcome::Rejected(_))
    }
}

/// The two legs of the authorization code handshake over any [`Session`].
///
/// `begin` runs when the browser hits `/auth` and yields the consent page URL.
/// `complete` runs when Spotify sends the browser back to `/callback`. Each
/// browser session carries at most one pending state token, consumed by
/// `complete` whether or not it matches.
#[derive(Clone)]
pub struct Handshake {
    client: SpotifyClient,
    hooks: Arc<dyn AuthHooks>,
}

impl Handshake {
    pub fn new(client: SpotifyClient, hooks: Arc<dyn AuthHooks>) -> Self {
        Self { client, hooks }
    }

    /// Stores a fresh state token (and PKCE verifier) plus the post-login target
    /// in the session and returns the Spotify consent page URL.
    ///
    /// Only same-site paths are kept as target; anything else is dropped so the
    /// login cannot bounce the browser to a foreign origin.
    pub async fn begin(&self, session: &dyn Session, redirect: Option<String>) -> Res<String> {
        let config = self.client.config();

        let redirect = redirect.filter(|target| {
            let local = utils::is_local_path(target);
            if !local {
                warn!(%target, "ignoring non-local redirect target");
            }
            local
        });

        match redirect {
            Some(target) => session.set(KEY_TARGET_URL, target).await,
            None => {
                session.pop(KEY_TARGET_URL).await;
            }
        }

        let state = utils::generate_state_token();
        session.set(KEY_STATE, state.clone()).await;

        let challenge = if config.use_pkce {
            let verifier = utils::generate_code_verifier();
            let challenge = utils::generate_code_challenge(&verifier);
            session.set(KEY_CODE_VERIFIER, verifier).await;
            Some(challenge)
        } else {
            session.pop(KEY_CODE_VERIFIER).await;
            None
        };

        auth::authorize_url(config, &state, challenge.as_deref())
    }

    /// Validates Spotify's callback, exchanges the code and runs the host hooks.
    ///
    /// # Flow
    ///
    /// 1. `error` parameter present: fail with that exact message
    /// 2. no `code`: fail with an invalid request
    /// 3. stored and returned `state` differ, or either is missing: fail closed
    /// 4. exchange the code; a rejected exchange is logged with full detail
    /// 5. `handle_auth`, then `on_success` or the redirect fallback
    ///
    /// Failures go to the `on_error` hook. Without one the error is returned.
    pub async fn complete(
        &self,
        session: &dyn Session,
        params: CallbackParams,
    ) -> Res<CallbackOutcome> {
        if let Some(error) = params.error {
            info!(%error, "spotify authorization denied");
            return self
                .fail(session, SpotifyError::UnhandledAuthorization(error))
                .await;
        }

        let Some(code) = params.code else {
            warn!("spotify callback without code");
            return self.fail(session, SpotifyError::InvalidRequest).await;
        };

        let stored_state = session.pop(KEY_STATE).await;
        let verifier = session.pop(KEY_CODE_VERIFIER).await;

        if !utils::states_match(stored_state.as_deref(), params.state.as_deref()) {
            warn!(
                stored = stored_state.is_some(),
                returned = params.state.is_some(),
                "spotify callback state mismatch"
            );
            return self.fail(session, SpotifyError::CsrfStateMismatch).await;
        }

        let config = self.client.config();
        if config.use_pkce && verifier.is_none() {
            warn!("spotify callback without pending pkce verifier");
            return self.fail(session, SpotifyError::InvalidRequest).await;
        }

        let record = match auth::exchange_code(
            self.client.http_client(),
            config,
            &code,
            verifier.as_deref(),
        )
        .await
        {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "spotify code exchange failed");
                return self.fail(session, e).await;
            }
        };

        self.succeed(session, record).await
    }

    async fn fail(&self, session: &dyn Session, err: SpotifyError) -> Res<CallbackOutcome> {
        match self.hooks.on_error(session, &err.public_message()).await {
            Some(response) => Ok(CallbackOutcome::Rejected(response)),
            None => Err(err),
        }
    }

    async fn succeed(&self, session: &dyn Session, record: AuthRecord) -> Res<CallbackOutcome> {
        self.hooks.handle_auth(session, &record).await?;

        if let Some(response) = self.hooks.on_success(session, &record).await {
            return Ok(CallbackOutcome::Response(response));
        }

        let target = session
            .pop(KEY_TARGET_URL)
            .await
            .or_else(|| self.client.config().default_redirect.clone());

        Ok(match target {
            Some(target) => CallbackOutcome::Redirect(target),
            None => CallbackOutcome::Authorized,
        })
    }
}
