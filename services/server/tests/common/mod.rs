#![allow(dead_code)]

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, Response, StatusCode, header},
    routing::{get as get_route, post as post_route},
};
use serde_json::{Value, json};
use server::{
    AppState,
    auth::oauth::{OAuthClient, OAuthConfig},
    config::{AppConfig, OAuthCredentials, RunMode, StoreBackend},
    models::Provider,
    repositories::MemoryUserRepository,
    routes,
    session::{MemorySessionStore, SESSION_COOKIE},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const FRONTEND_URL: &str = "http://localhost:3000";
pub const BASE_URL: &str = "http://localhost:8000";

pub struct TestApp {
    pub router: Router,
    pub users: MemoryUserRepository,
    pub sessions: MemorySessionStore,
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("request failed")
    }
}

pub fn config() -> AppConfig {
    AppConfig {
        port: 8000,
        run_mode: RunMode::Development,
        session_secret: "test-secret-that-is-long-enough-for-signing".to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        base_url: BASE_URL.to_string(),
        store_backend: StoreBackend::Memory,
        session_cookie_secure: false,
        google_client_id: None,
        google_client_secret: None,
        github_client_id: None,
        github_client_secret: None,
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(config())
}

pub fn spawn_app_with(config: AppConfig) -> TestApp {
    build_app(config, |_| {})
}

/// App whose Google and GitHub clients talk to the mock provider at `provider_url`
pub fn spawn_app_with_provider(provider_url: &str) -> TestApp {
    build_app(config(), |state| {
        state.google = Some(Arc::new(mock_client(Provider::Google, provider_url)));
        state.github = Some(Arc::new(mock_client(Provider::GitHub, provider_url)));
    })
}

fn build_app(config: AppConfig, configure: impl FnOnce(&mut AppState)) -> TestApp {
    let users = MemoryUserRepository::default();
    let sessions = MemorySessionStore::default();
    let mut state = AppState::with_stores(
        config,
        Arc::new(users.clone()),
        Arc::new(sessions.clone()),
    )
    .expect("failed to build state");
    configure(&mut state);

    TestApp {
        router: routes::create_router(state),
        users,
        sessions,
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn post_empty(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("failed to build request")
}

/// Full `Set-Cookie` header for the session cookie, if any
pub fn set_session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{}=", SESSION_COOKIE)))
        .map(str::to_string)
}

/// `name=value` pair to send back in a `Cookie` header
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    set_session_cookie(resp)
        .and_then(|value| value.split(';').next().map(str::to_string))
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("missing Location header")
        .to_string()
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body")
        .to_vec()
}

pub async fn json_body(resp: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).expect("response body was not JSON")
}

/// Whether `/authenticated` reports a session for this cookie
pub async fn is_authenticated(app: &TestApp, cookie: Option<&str>) -> bool {
    let resp = app.send(get("/authenticated", cookie)).await;
    json_body(resp).await["auth"]
        .as_bool()
        .expect("auth flag missing")
}

/// Sign up and return the session cookie
pub async fn signup(app: &TestApp, email: &str, password: &str) -> String {
    let resp = app
        .send(post_json(
            "/signup",
            serde_json::json!({ "email": email, "password": password }),
            None,
        ))
        .await;
    assert_eq!(resp.status(), 200);
    session_cookie(&resp).expect("signup did not set a session cookie")
}

pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";
pub const GOOGLE_SUBJECT: &str = "google-123";
pub const GOOGLE_EMAIL: &str = "Person@Example.com";
pub const GITHUB_SUBJECT: i64 = 4242;
pub const GITHUB_EMAIL: &str = "octo@example.com";

fn mock_client(provider: Provider, provider_url: &str) -> OAuthClient {
    let credentials = OAuthCredentials {
        client_id: format!("{}-client", provider),
        client_secret: format!("{}-secret", provider),
    };
    let callback = format!("{}/auth/{}/callback", BASE_URL, provider);
    let defaults = match provider {
        Provider::GitHub => OAuthConfig::github(credentials, callback),
        _ => OAuthConfig::google(credentials, callback),
    };

    let config = OAuthConfig {
        auth_url: format!("{}/authorize", provider_url),
        token_url: format!("{}/token", provider_url),
        profile_url: match provider {
            Provider::GitHub => format!("{}/user", provider_url),
            _ => format!("{}/userinfo", provider_url),
        },
        emails_url: defaults
            .emails_url
            .as_ref()
            .map(|_| format!("{}/user/emails", provider_url)),
        ..defaults
    };

    OAuthClient::new(provider, config).expect("failed to build mock client")
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(format!("Bearer {}", MOCK_ACCESS_TOKEN).as_str())
}

/// Serve a provider that accepts any code; returns its base URL
pub async fn spawn_mock_provider() -> String {
    let router = Router::new()
        .route(
            "/token",
            post_route(|| async {
                Json(json!({
                    "access_token": MOCK_ACCESS_TOKEN,
                    "token_type": "bearer",
                    "expires_in": 3600
                }))
            }),
        )
        .route(
            "/userinfo",
            get_route(|headers: HeaderMap| async move {
                if !bearer_ok(&headers) {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!({
                    "id": GOOGLE_SUBJECT,
                    "email": GOOGLE_EMAIL,
                    "verified_email": true,
                    "name": "Person"
                })))
            }),
        )
        .route(
            "/user",
            get_route(|headers: HeaderMap| async move {
                if !bearer_ok(&headers) {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!({
                    "id": GITHUB_SUBJECT,
                    "login": "octocat",
                    "email": null,
                    "name": null
                })))
            }),
        )
        .route(
            "/user/emails",
            get_route(|headers: HeaderMap| async move {
                if !bearer_ok(&headers) {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!([
                    { "email": "old@example.com", "primary": false, "verified": true },
                    { "email": GITHUB_EMAIL, "primary": true, "verified": true }
                ])))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock provider");
    let addr = listener.local_addr().expect("mock provider has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("mock provider stopped");
    });

    format!("http://{}", addr)
}

/// `state` query parameter of a consent screen redirect
pub fn consent_state(consent_url: &str) -> String {
    oauth2::url::Url::parse(consent_url)
        .expect("consent URL did not parse")
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("consent URL has no state")
}
