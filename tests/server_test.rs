use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderValue, Request, StatusCode,
        header::{COOKIE, LOCATION, SET_COOKIE},
    },
};
use serde_json::json;
use sporlauth::{
    api::{self, SessionAuthHooks},
    config::SpotifyConfig,
    management::{MemorySession, SESSION_COOKIE, SessionRegistry},
    server::{SpotifyApp, router},
    utils::cookie_value,
};
use tower::ServiceExt;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn test_app(server: &MockServer) -> Arc<SpotifyApp> {
    let config = SpotifyConfig::new(
        "client-id",
        "client-secret",
        "http://localhost:5000/spotify/callback",
    )
    .with_endpoints(
        format!("{}/authorize", server.uri()),
        format!("{}/api/token", server.uri()),
        format!("{}/v1", server.uri()),
    );
    Arc::new(SpotifyApp::new(config).with_hooks(Arc::new(SessionAuthHooks)))
}

fn cookie_headers(sid: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("{SESSION_COOKIE}={sid}")).unwrap(),
    );
    headers
}

fn get(uri: &str, sid: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(sid) = sid {
        builder = builder.header(COOKIE, format!("{SESSION_COOKIE}={sid}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = MockServer::start().await;
    let response = router(test_app(&server))
        .oneshot(get("/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_then_callback_through_router() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&server);

    // /auth issues a session cookie and redirects to Spotify
    let response = router(app.clone())
        .oneshot(get("/auth?redirect=/me", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    let sid = cookie_value(set_cookie.split(';').next().unwrap(), SESSION_COOKIE)
        .unwrap()
        .to_string();
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    let state = Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    // Spotify sends the browser back with the same cookie
    let response = router(app.clone())
        .oneshot(get(
            &format!("/callback?code=the-code&state={state}"),
            Some(&sid),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/me");

    // the login moves the session to a new id
    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    let rotated = cookie_value(set_cookie.split(';').next().unwrap(), SESSION_COOKIE)
        .unwrap()
        .to_string();
    assert_ne!(rotated, sid);
    assert_eq!(app.sessions().len().await, 1);

    let (session, issued) = app.sessions().resolve(&cookie_headers(&rotated)).await;
    assert!(issued.is_none());
    assert!(api::load_auth(&session).await.unwrap().is_some());

    let (_, issued) = app.sessions().resolve(&cookie_headers(&sid)).await;
    assert!(issued.is_some());
}

#[tokio::test]
async fn test_cookieless_callbacks_do_not_register_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = test_app(&server);

    for _ in 0..200 {
        let response = router(app.clone())
            .oneshot(get("/callback?code=x&state=y", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    // unknown ids are not adopted either
    router(app.clone())
        .oneshot(get("/callback?code=x&state=y", Some("made-up")))
        .await
        .unwrap();

    assert!(app.sessions().is_empty().await);
}

#[tokio::test]
async fn test_failed_callback_keeps_session_id() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = router(app.clone())
        .oneshot(get("/auth", None))
        .await
        .unwrap();
    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    let sid = cookie_value(set_cookie.split(';').next().unwrap(), SESSION_COOKIE)
        .unwrap()
        .to_string();

    let response = router(app.clone())
        .oneshot(get("/callback?code=x&state=forged", Some(&sid)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let (_, issued) = app.sessions().resolve(&cookie_headers(&sid)).await;
    assert!(issued.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_idle_sessions_expire() {
    let registry = SessionRegistry::new().with_ttl(Duration::from_secs(60));

    let (_, first) = registry.resolve(&HeaderMap::new()).await;
    let first = first.unwrap();
    assert!(registry.lookup(&cookie_headers(&first)).await.is_some());

    tokio::time::advance(Duration::from_secs(61)).await;

    // issuing a new session sweeps the idle one
    let (_, second) = registry.resolve(&HeaderMap::new()).await;
    assert_eq!(registry.len().await, 1);
    assert!(registry.lookup(&cookie_headers(&first)).await.is_none());
    assert!(registry.lookup(&cookie_headers(&second.unwrap())).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_lookup_keeps_active_sessions_alive() {
    let registry = SessionRegistry::new().with_ttl(Duration::from_secs(60));
    let (_, sid) = registry.resolve(&HeaderMap::new()).await;
    let sid = sid.unwrap();

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(registry.lookup(&cookie_headers(&sid)).await.is_some());
    }
}

#[tokio::test]
async fn test_cookie_attributes() {
    let plain = SessionRegistry::new().cookie("abc");
    assert_eq!(plain, "sporlauth_sid=abc; Path=/; HttpOnly; SameSite=Lax");

    let secure = SessionRegistry::new().with_secure_cookies(true).cookie("abc");
    assert!(secure.ends_with("; Secure"));
}

#[tokio::test]
async fn test_callback_with_foreign_state_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = router(test_app(&server))
        .oneshot(get("/callback?code=the-code&state=forged", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_session_auth_hooks_store_and_load() {
    let session = MemorySession::new();
    assert!(api::load_auth(&session).await.unwrap().is_none());

    let record = sporlauth::types::AuthRecord::new("a", "r", 42);
    api::store_auth(&session, &record).await.unwrap();

    assert_eq!(api::load_auth(&session).await.unwrap(), Some(record));
}
