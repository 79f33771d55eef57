//! Satchel Web
//!
//! Axum integration for satchel sessions and a small demo server exercising
//! every session operation over HTTP.

pub mod cookie;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod seal;
pub mod server;
pub mod state;

// Re-export main types
pub use extract::ActiveSession;
pub use middleware::{commit, session_middleware, SkipSession};
pub use seal::PrivateSealer;
pub use server::SatchelServer;
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    Json, Router,
};
use satchel_core::SatchelError;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    // Session cookies need credentialed CORS
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
    /// Session settings file (TOML)
    pub settings_path: Option<String>,
    /// Maximum number of sessions held by the in-memory cache
    pub cache_max_entries: usize,
    /// Seconds between sweeps of expired cache entries
    pub cleanup_interval_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            settings_path: None,
            cache_max_entries: 10_000,
            cleanup_interval_secs: 300,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("SATCHEL_HOST").unwrap_or(defaults.host),
            port: std::env::var("SATCHEL_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            dev_mode: std::env::var("SATCHEL_DEV_MODE")
                .ok()
                .and_then(|dev| dev.parse().ok())
                .unwrap_or(defaults.dev_mode),
            settings_path: std::env::var("SATCHEL_SETTINGS").ok(),
            cache_max_entries: std::env::var("SATCHEL_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|max| max.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            cleanup_interval_secs: std::env::var("SATCHEL_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|secs| secs.parse().ok())
                .unwrap_or(defaults.cleanup_interval_secs),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Session(#[from] SatchelError),

    #[error("No session attached to this request")]
    SessionMissing,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            WebError::Session(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.code()),
            WebError::Session(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.code()),
            WebError::SessionMissing => (StatusCode::INTERNAL_SERVER_ERROR, "session_missing"),
            WebError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "serialization"),
            WebError::Server(_) => (StatusCode::INTERNAL_SERVER_ERROR, "server"),
            WebError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
        };

        let body = Json(json!({
            "error": error_code,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
