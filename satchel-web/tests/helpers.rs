//! Test helpers driving the demo router in-process

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use satchel_core::SessionSettings;
use satchel_web::{create_app, AppState, WebConfig};
use serde_json::Value;
use std::sync::LazyLock;
use tower::ServiceExt;

pub const PASSWORD: &str = "some-not-random-password-that-is-also-long-enough";

// Tracing is only initialized once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let level = if std::env::var("TEST_LOG").is_ok() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
});

pub fn settings() -> SessionSettings {
    SessionSettings::with_password(PASSWORD)
}

pub fn spawn_state(settings: SessionSettings) -> AppState {
    LazyLock::force(&TRACING);
    AppState::new(WebConfig::default(), settings).expect("Failed to build application state")
}

/// One response, with its body parsed as JSON (`Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookies: Vec<String>,
}

impl TestResponse {
    /// Value of the first Set-Cookie header for `name`
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.set_cookies.iter().find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (cookie_name, value) = pair.split_once('=')?;
            (cookie_name == name).then(|| value.to_string())
        })
    }
}

/// Browser-like client keeping the session cookie between requests
pub struct TestClient {
    pub app: Router,
    pub cookie: Option<String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    pub fn for_settings(settings: SessionSettings) -> (Self, AppState) {
        let state = spawn_state(settings);
        (Self::new(create_app(state.clone())), state)
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, format!("session={}", cookie));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.send_raw(request).await;

        // Follow the server's cookie instructions like a browser would
        if let Some(value) = response.cookie_value("session") {
            self.cookie = (!value.is_empty()).then_some(value);
        }

        response
    }

    pub async fn send_raw(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            body,
            set_cookies,
        }
    }
}
