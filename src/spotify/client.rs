use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::{
    Client, Method, Response, StatusCode,
    header::{ACCEPT, RETRY_AFTER},
};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    Res,
    config::{EXPIRY_MARGIN_SECS, SpotifyConfig},
    error::SpotifyError,
    management::AuthUpdateListener,
    spotify::auth,
    types::{AuthRecord, Payload, RequestOptions, ResponseBody, SpotifyResponse},
    utils,
};

/// Authenticated Spotify Web API client.
///
/// Holds no per-user state: the caller passes an [`AuthRecord`] with every
/// request and gets the (possibly refreshed) record back. Cloning is cheap and
/// all clones share one connection pool.
///
/// Two concurrent requests with the same record may both decide to refresh it.
/// Both refreshes succeed against Spotify and each caller gets a valid record;
/// the host keeps whichever it persists last.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    config: Arc<SpotifyConfig>,
    listener: Option<Arc<dyn AuthUpdateListener>>,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: SpotifyConfig, http: Client) -> Self {
        Self {
            http,
            config: Arc::new(config),
            listener: None,
        }
    }

    /// Registers a listener awaited after every refresh.
    pub fn with_update_listener(mut self, listener: Arc<dyn AuthUpdateListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// Refreshes `record` and notifies the update listener, if any.
    ///
    /// The new record is returned only after the listener completed, so a failed
    /// persist never leaves the caller holding an unsaved token.
    pub async fn refresh(&self, record: &AuthRecord) -> Res<AuthRecord> {
        let refreshed = auth::refresh_auth(&self.http, &self.config, record).await?;
        if let Some(listener) = &self.listener {
            listener.auth_updated(&refreshed).await?;
        }
        Ok(refreshed)
    }

    pub async fn get(&self, record: &AuthRecord, endpoint: &str) -> Res<SpotifyResponse> {
        self.request(record, endpoint, RequestOptions::new(Method::GET).parse_json())
            .await
    }

    pub async fn post(
        &self,
        record: &AuthRecord,
        endpoint: &str,
        payload: Payload,
    ) -> Res<SpotifyResponse> {
        let options = RequestOptions::new(Method::POST)
            .payload(payload)
            .parse_json();
        self.request(record, endpoint, options).await
    }

    pub async fn put(
        &self,
        record: &AuthRecord,
        endpoint: &str,
        payload: Payload,
    ) -> Res<SpotifyResponse> {
        let options = RequestOptions::new(Method::PUT).payload(payload);
        self.request(record, endpoint, options).await
    }

    pub async fn delete(&self, record: &AuthRecord, endpoint: &str) -> Res<SpotifyResponse> {
        self.request(record, endpoint, RequestOptions::new(Method::DELETE))
            .await
    }

    /// Issues an authenticated call to `endpoint`.
    ///
    /// 1. A token expiring within 60 seconds is refreshed before the call.
    /// 2. The call carries `Authorization: Bearer` and `Accept: application/json`.
    /// 3. On 429 the client sleeps for `Retry-After` seconds and sends the same
    ///    request again, for as long as Spotify keeps asking unless
    ///    `max_rate_limit_retries` is configured.
    /// 4. Any other non-2xx status fails with [`SpotifyError::UpstreamApi`].
    ///
    /// `endpoint` is appended to the configured API base URL unless it already
    /// is an absolute URL, such as a pagination `next` link.
    ///
    /// # Errors
    ///
    /// - [`SpotifyError::UpstreamAuth`] when the pre-flight refresh fails
    /// - [`SpotifyError::UpstreamApi`] for non-2xx, non-429 responses
    /// - [`SpotifyError::Protocol`] for a 429 without a usable `Retry-After`
    /// - [`SpotifyError::RateLimited`] once the retry budget is spent
    /// - [`SpotifyError::Http`] for network failures
    pub async fn request(
        &self,
        record: &AuthRecord,
        endpoint: &str,
        options: RequestOptions,
    ) -> Res<SpotifyResponse> {
        let mut auth_changed = false;
        let mut auth = record.clone();
        if auth.expires_within(EXPIRY_MARGIN_SECS, utils::now_timestamp()) {
            auth = self.refresh(&auth).await?;
            auth_changed = true;
        }

        let url = self.endpoint_url(endpoint);
        let mut retries: u32 = 0;

        loop {
            debug!(method = %options.method, %url, "dispatching spotify api request");
            let response = self.dispatch(&auth, &url, &options).await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = utils::parse_retry_after(response.headers().get(RETRY_AFTER))?;
                if let Some(max) = self.config.max_rate_limit_retries {
                    if retries >= max {
                        return Err(SpotifyError::RateLimited { attempts: retries });
                    }
                }
                retries += 1;
                warn!(%url, retry_after, attempt = retries, "rate limited by spotify");
                sleep(Duration::from_secs(retry_after)).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SpotifyError::UpstreamApi {
                    status: status.as_u16(),
                    body,
                });
            }

            return Self::into_spotify_response(response, auth, auth_changed, options.parse_json)
                .await;
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.config.api_url.trim_end_matches('/'), endpoint)
        }
    }

    async fn dispatch(
        &self,
        auth: &AuthRecord,
        url: &str,
        options: &RequestOptions,
    ) -> Res<Response> {
        let mut builder = self
            .http
            .request(options.method.clone(), url)
            .bearer_auth(auth.access_token())
            .header(ACCEPT, "application/json");

        builder = match &options.payload {
            Some(Payload::Json(value)) => builder.json(value),
            Some(Payload::Form(fields)) => builder.form(fields),
            None => builder,
        };

        Ok(builder.send().await?)
    }

    async fn into_spotify_response(
        response: Response,
        auth: AuthRecord,
        auth_changed: bool,
        parse_json: bool,
    ) -> Res<SpotifyResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let bytes = response.bytes().await?.to_vec();
        let body = if parse_json {
            // 201/204 responses from Spotify frequently come without a body
            if bytes.is_empty() {
                ResponseBody::Json(serde_json::Value::Null)
            } else {
                ResponseBody::Json(serde_json::from_slice(&bytes)?)
            }
        } else {
            ResponseBody::Bytes(bytes)
        };

        Ok(SpotifyResponse {
            auth_changed,
            auth,
            status,
            headers,
            body,
        })
    }
}
