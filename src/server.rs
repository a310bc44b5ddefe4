use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Router, routing::get};
use tracing::info;

use crate::{
    Res,
    api::{self, AuthHooks, DefaultHooks, handshake::Handshake},
    config::SpotifyConfig,
    error::SpotifyError,
    management::{AuthUpdateListener, SessionRegistry},
    spotify::SpotifyClient,
};

/// Everything the bundled handlers need: the API client, the host hooks and the
/// session registry. Share it behind an `Arc` as router state.
pub struct SpotifyApp {
    client: SpotifyClient,
    hooks: Arc<dyn AuthHooks>,
    sessions: SessionRegistry,
}

impl SpotifyApp {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            client: SpotifyClient::new(config),
            hooks: Arc::new(DefaultHooks),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AuthHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_client(mut self, client: SpotifyClient) -> Self {
        self.client = client;
        self
    }

    pub fn with_update_listener(mut self, listener: Arc<dyn AuthUpdateListener>) -> Self {
        self.client = self.client.with_update_listener(listener);
        self
    }

    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn client(&self) -> &SpotifyClient {
        &self.client
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn handshake(&self) -> Handshake {
        Handshake::new(self.client.clone(), Arc::clone(&self.hooks))
    }
}

/// Routes `/auth`, `/callback` and `/health`, ready to be nested by the host.
///
/// The configured `redirect_uri` must point at the mounted `/callback`, e.g.
/// `http://localhost:5000/spotify/callback` for a router nested at `/spotify`.
pub fn router(app: Arc<SpotifyApp>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/auth", get(api::auth))
        .route("/callback", get(api::callback))
        .with_state(app)
}

pub async fn start_api_server(addr: &str, app: Router) -> Res<()> {
    let addr = SocketAddr::from_str(addr)
        .map_err(|e| SpotifyError::Config(format!("Failed to parse server address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
