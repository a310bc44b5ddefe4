use reqwest::{Client, header::ACCEPT};
use tracing::{debug, error};
use url::Url;

use crate::{
    Res,
    config::SpotifyConfig,
    error::SpotifyError,
    types::{AuthRecord, TokenResponse},
    utils,
};

/// Builds the Spotify consent page URL the browser is redirected to.
///
/// # Arguments
///
/// * `config` - client id, redirect URI, scope and endpoint settings
/// * `state` - anti-forgery token stored in the browser session
/// * `code_challenge` - S256 PKCE challenge, sent only when PKCE is enabled
///
/// # Example
///
/// ```
/// let url = authorize_url(&config, &state, None)?;
/// // https://accounts.spotify.com/authorize?client_id=...&response_type=code&...
/// ```
pub fn authorize_url(
    config: &SpotifyConfig,
    state: &str,
    code_challenge: Option<&str>,
) -> Res<String> {
    let mut url = Url::parse(&config.auth_url)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("state", state);

        if let Some(scope) = config.scope_param() {
            query.append_pair("scope", &scope);
        }
        if let Some(challenge) = code_challenge {
            query
                .append_pair("code_challenge", challenge)
                .append_pair("code_challenge_method", "S256");
        }
        if config.show_dialog {
            query.append_pair("show_dialog", "true");
        }
    }
    Ok(url.to_string())
}

/// Exchanges an authorization code for the initial [`AuthRecord`].
///
/// Spotify always returns a refresh token for this grant; its absence is a
/// protocol error. `expires_in` is converted to an absolute `expires_at` right
/// away since every later expiry check needs the absolute value.
///
/// # Errors
///
/// - [`SpotifyError::UpstreamAuth`] when the token endpoint answers non-2xx
/// - [`SpotifyError::Http`] for network failures
/// - [`SpotifyError::Protocol`] when no refresh token came back
pub async fn exchange_code(
    http: &Client,
    config: &SpotifyConfig,
    code: &str,
    code_verifier: Option<&str>,
) -> Res<AuthRecord> {
    let mut form = vec![
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
        ("code", code),
    ];
    if let Some(verifier) = code_verifier {
        form.push(("code_verifier", verifier));
    }

    let token = post_token(http, config, &form).await?;
    let refresh_token = token.refresh_token.ok_or_else(|| {
        SpotifyError::Protocol("token endpoint returned no refresh_token".to_string())
    })?;

    Ok(AuthRecord::new(
        token.access_token,
        refresh_token,
        utils::now_timestamp() + token.expires_in,
    ))
}

/// Exchanges the record's refresh token for a new access token.
///
/// Returns a new record; the one passed in is left untouched. The refresh token
/// is kept unless Spotify issued a new one. A failed refresh is never retried.
///
/// # Errors
///
/// - [`SpotifyError::UpstreamAuth`] when the token endpoint answers non-2xx
/// - [`SpotifyError::Http`] for network failures
pub async fn refresh_auth(
    http: &Client,
    config: &SpotifyConfig,
    record: &AuthRecord,
) -> Res<AuthRecord> {
    debug!(user_id = ?record.user_id(), "refreshing spotify access token");

    let form = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("grant_type", "refresh_token"),
        ("refresh_token", record.refresh_token()),
    ];

    let token = post_token(http, config, &form).await?;
    Ok(record.refreshed(
        token.access_token,
        utils::now_timestamp() + token.expires_in,
        token.refresh_token,
    ))
}

async fn post_token(
    http: &Client,
    config: &SpotifyConfig,
    form: &[(&str, &str)],
) -> Res<TokenResponse> {
    let response = http
        .post(&config.token_url)
        .header(ACCEPT, "application/json")
        .form(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), %body, "spotify token endpoint rejected request");
        return Err(SpotifyError::UpstreamAuth {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json::<TokenResponse>().await?)
}
