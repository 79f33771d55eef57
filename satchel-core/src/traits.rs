//! Core trait definitions

use crate::error::SatchelResult;
use crate::types::SessionStore;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Server-side session storage
///
/// Implementations provide their own per-key atomicity; the engine never locks.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Fetch the store saved under `id`
    async fn get(&self, id: &str) -> SatchelResult<Option<SessionStore>>;

    /// Save `store` under `id`; a zero `ttl` defers to the cache's own default
    async fn set(&self, id: &str, store: &SessionStore, ttl: Duration) -> SatchelResult<()>;

    /// Forget the store saved under `id`
    async fn remove(&self, id: &str) -> SatchelResult<()>;

    /// Whether the cache can currently serve requests
    fn is_ready(&self) -> bool;
}

/// Cookie codec that turns session content into an opaque tamper-proof string and back
#[async_trait]
pub trait CookieSealer: Send + Sync {
    async fn seal(&self, content: &Value) -> SatchelResult<String>;

    async fn unseal(&self, sealed: &str) -> SatchelResult<Value>;
}
