//! Shared setup for the API integration tests
//!
//! Each test gets its own in-memory database and audio directory and drives
//! the router in-process.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use melodia_api::AppState;
use melodia_common::{db, Settings};
use melodia_import::TrackCatalog;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const PREFIX: &str = "/api/v1";
pub const PASSWORD: &str = "secret123";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub audio_dir: TempDir,
}

pub fn test_settings(audio_dir: &TempDir) -> Settings {
    Settings {
        database_url: "sqlite::memory:".to_string(),
        secret_key: Some("test-secret-key-for-integration-tests".to_string()),
        bcrypt_cost: 4,
        audio_storage_dir: audio_dir.path().to_path_buf(),
        ..Settings::default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None, |s| s).await
    }

    pub async fn with_catalog(catalog: Arc<dyn TrackCatalog>) -> Self {
        Self::build(Some(catalog), |s| s).await
    }

    pub async fn with_settings(adjust: impl FnOnce(Settings) -> Settings) -> Self {
        Self::build(None, adjust).await
    }

    async fn build(catalog: Option<Arc<dyn TrackCatalog>>, adjust: impl FnOnce(Settings) -> Settings) -> Self {
        let audio_dir = tempfile::tempdir().expect("Failed to create audio dir");
        let settings = adjust(test_settings(&audio_dir));

        let pool = db::init_database(&settings.database_url)
            .await
            .expect("Failed to init database");

        let mut state = AppState::new(pool, settings).expect("Failed to build state");
        if let Some(catalog) = catalog {
            state = state.with_catalog(catalog);
        }

        let router = melodia_api::build_router(state.clone());

        Self {
            router,
            state,
            audio_dir,
        }
    }

    /// Send a request and return status, headers and raw body
    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    /// JSON request under the API prefix; non-JSON response bodies come back as `Null`
    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{}", PREFIX, path));

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, _, bytes) = self.send_raw(request).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, token, None).await
    }

    pub async fn register(&self, email: &str, username: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/register",
            None,
            json!({ "email": email, "username": username, "password": PASSWORD }),
        )
        .await
    }

    pub async fn login(&self, email: &str) -> Value {
        let (status, body) = self
            .post("/auth/login", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body
    }

    /// Register and log in; returns the access token
    pub async fn user_token(&self, name: &str) -> String {
        let email = format!("{}@example.com", name);
        let (status, body) = self.register(&email, name).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        self.login(&email).await["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Create a song; returns its id
    pub async fn create_song(&self, token: &str, title: &str, artist: &str) -> i64 {
        let (status, body) = self
            .post(
                "/songs",
                Some(token),
                json!({
                    "title": title,
                    "artist": artist,
                    "duration": 200,
                    "url": format!("http://example.com/{}", title.replace(' ', "-")),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create song failed: {}", body);
        body["id"].as_i64().unwrap()
    }
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}
