//! Satchel Web Server
//!
//! Demo server hosting the session middleware with Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use satchel_core::SessionSettings;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct SatchelServer {
    config: WebConfig,
    state: AppState,
}

impl SatchelServer {
    /// Create a server; session settings are validated here
    pub fn new(config: WebConfig, settings: SessionSettings) -> WebResult<Self> {
        let state = AppState::new(config.clone(), settings)?;

        Ok(Self { config, state })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting satchel web server");
        info!("Server address: http://{}", address);
        info!("Development mode: {}", self.config.dev_mode);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        // Sweep expired sessions out of the cache
        let cleanup = self
            .state
            .cache
            .start_cleanup_task(Duration::from_secs(self.config.cleanup_interval_secs.max(1)));

        let result = serve(listener, app).await;
        cleanup.abort();

        if let Err(e) = result {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for SatchelServer
pub struct SatchelServerBuilder {
    config: WebConfig,
    settings: Option<SessionSettings>,
}

impl SatchelServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
            settings: None,
        }
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: WebConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    /// Read session settings from this TOML file at build time
    pub fn settings_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.settings_path = Some(path.into());
        self
    }

    /// Use these session settings instead of loading them
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn cache_max_entries(mut self, max_entries: usize) -> Self {
        self.config.cache_max_entries = max_entries;
        self
    }

    /// Build the server
    ///
    /// Without explicit settings they are loaded from the settings file and
    /// `SATCHEL__*` environment variables.
    pub fn build(self) -> WebResult<SatchelServer> {
        let settings = match self.settings {
            Some(settings) => settings,
            None => SessionSettings::load(self.config.settings_path.as_deref().map(Path::new))?,
        };

        SatchelServer::new(self.config, settings)
    }
}

impl Default for SatchelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "password-should-be-32-characters-long";

    #[test]
    fn test_server_creation() {
        let server = SatchelServer::new(WebConfig::default(), SessionSettings::with_password(PASSWORD));
        assert!(server.is_ok());
    }

    #[test]
    fn test_short_password_is_rejected() {
        let server = SatchelServer::new(WebConfig::default(), SessionSettings::with_password("short"));
        assert!(server.is_err());
    }

    #[test]
    fn test_server_builder() {
        let builder = SatchelServerBuilder::new()
            .host("localhost")
            .port(3000)
            .dev_mode(true)
            .cache_max_entries(10);

        assert_eq!(builder.config.host, "localhost");
        assert_eq!(builder.config.port, 3000);
        assert!(builder.config.dev_mode);
        assert_eq!(builder.config.cache_max_entries, 10);
    }

    #[test]
    fn test_builder_adds_sessionless_routes() {
        let server = SatchelServerBuilder::new()
            .settings(SessionSettings::with_password(PASSWORD))
            .build()
            .unwrap();

        let settings = server.state().sessions.settings();
        assert!(settings.skips_route("/api/health"));
        assert!(settings.skips_route("/api/public"));
    }
}
