use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use clap::{
    Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use tracing_subscriber::EnvFilter;

use sporlauth::{
    api::{self, SessionAuthHooks},
    config::{self, SpotifyConfig},
    error,
    error::SpotifyError,
    server::{self, SpotifyApp},
    success,
    types::ResponseBody,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

/// Demo host: mounts the Spotify login under `/spotify` and serves `/me`.
#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Spotify client id (falls back to SPOTIFY_API_AUTH_CLIENT_ID)
    #[clap(long)]
    client_id: Option<String>,

    /// Spotify client secret (falls back to SPOTIFY_API_AUTH_CLIENT_SECRET)
    #[clap(long)]
    client_secret: Option<String>,

    /// Address to listen on (falls back to SERVER_ADDRESS)
    #[clap(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    let address = cli.address.unwrap_or_else(config::server_addr);

    let spotify_config = match (cli.client_id, cli.client_secret) {
        (Some(id), Some(secret)) => {
            SpotifyConfig::new(id, secret, format!("http://{address}/spotify/callback"))
        }
        _ => match SpotifyConfig::from_env() {
            Ok(c) => c,
            Err(e) => error!("{}", e),
        },
    };

    let app = Arc::new(SpotifyApp::new(spotify_config).with_hooks(Arc::new(SessionAuthHooks)));

    let host = Router::new()
        .route("/", get(index))
        .route("/me", get(me))
        .with_state(Arc::clone(&app))
        .nest("/spotify", server::router(app));

    success!("Open http://{}/me to log in with Spotify", address);
    if let Err(e) = server::start_api_server(&address, host).await {
        error!("Server stopped: {}", e);
    }
}

async fn index() -> &'static str {
    "hi!"
}

async fn me(State(app): State<Arc<SpotifyApp>>, headers: HeaderMap) -> Response {
    let (session, new_sid) = app.sessions().resolve(&headers).await;

    let record = match api::load_auth(&session).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            let response = Redirect::temporary("/spotify/auth?redirect=/me").into_response();
            return api::with_session_cookie(response, app.sessions(), new_sid.as_deref());
        }
        Err(e) => return e.into_response(),
    };

    let response = match app.client().get(&record, "/me").await {
        Ok(response) => response,
        Err(e) => return api_error(e),
    };

    if response.auth_changed {
        if let Err(e) = api::store_auth(&session, &response.auth).await {
            return e.into_response();
        }
    }

    match response.body {
        ResponseBody::Json(value) => Json(value).into_response(),
        ResponseBody::Bytes(bytes) => bytes.into_response(),
    }
}

fn api_error(e: SpotifyError) -> Response {
    tracing::error!(error = %e, "spotify api call failed");
    match e {
        SpotifyError::UpstreamApi { status, .. } => {
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY).into_response()
        }
        _ => StatusCode::BAD_GATEWAY.into_response(),
    }
}
