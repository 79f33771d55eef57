//! Application state shared by handlers

use crate::{routes, PrivateSealer, WebConfig, WebResult};
use satchel_core::{MemoryCache, SessionManager, SessionSettings};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: WebConfig,
    /// Session engine registered for this server
    pub sessions: Arc<SessionManager>,
    /// Cache backing oversized sessions
    pub cache: MemoryCache,
}

impl AppState {
    /// Register the session engine with an in-memory cache and encrypted cookies
    ///
    /// Routes that never touch a session are added to the skipped routes.
    pub fn new(config: WebConfig, mut settings: SessionSettings) -> WebResult<Self> {
        for route in routes::SESSIONLESS_ROUTES {
            if !settings.skips_route(route) {
                settings.skip_routes.push(route.to_string());
            }
        }

        let cache = MemoryCache::new(config.cache_max_entries, None);
        let sealer = PrivateSealer::from_options(&settings.cookie)?;

        let sessions = SessionManager::builder(settings)
            .cache(Arc::new(cache.clone()))
            .sealer(Arc::new(sealer))
            .build()?;

        info!(max_entries = config.cache_max_entries, "Application state initialized");

        Ok(Self {
            config,
            sessions,
            cache,
        })
    }

    /// Invalidate a session from outside any request
    pub async fn revoke(&self, id: &str) -> WebResult<()> {
        self.sessions.revoke(id).await?;
        Ok(())
    }
}
