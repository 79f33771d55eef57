//! Session lifecycle controller
//!
//! Loads a [`Session`] when a request starts and decides, when the response is
//! produced, whether its state travels in the cookie or goes to the cache.

use crate::cache::MemoryCache;
use crate::config::{SessionSettings, ID_GENERATOR_CUSTOM};
use crate::error::{ErrorContext, SatchelError, SatchelResult};
use crate::id::{generate_checked, SessionIdGenerator, SharedIdGenerator, UuidGenerator};
use crate::record::SessionRecord;
use crate::session::Session;
use crate::traits::{CookieSealer, SessionCache};
use crate::types::{CookieContent, CookieDirective, RequestContext, SessionStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates session load and commit for every request of a server
pub struct SessionManager {
    settings: Arc<SessionSettings>,
    cache: Arc<dyn SessionCache>,
    sealer: Arc<dyn CookieSealer>,
    id_generator: SharedIdGenerator,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie", &self.settings.name)
            .field("max_cookie_size", &self.settings.max_cookie_size)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn builder(settings: SessionSettings) -> SessionManagerBuilder {
        SessionManagerBuilder::new(settings)
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<dyn SessionCache> {
        &self.cache
    }

    /// Attach a session to a request
    ///
    /// Returns `None` when the route opts out. `raw_cookie` is the sealed value of
    /// the session cookie, if the request carried one.
    pub async fn load(
        self: &Arc<Self>,
        request: RequestContext,
        raw_cookie: Option<&str>,
        skip: bool,
    ) -> SatchelResult<Option<Session>> {
        let skipped_route = request
            .matched_route
            .as_deref()
            .is_some_and(|route| self.settings.skips_route(route));

        if skip || skipped_route {
            debug!(path = %request.path, "Route opted out of sessions");
            return Ok(None);
        }

        let (content, invalid_cookie) = match raw_cookie {
            Some(raw) => self.read_cookie(raw).await?,
            None => (None, false),
        };

        let mut record = match content {
            // First visit, or a cookie without a usable id
            None => {
                let id = generate_checked(self.id_generator.as_ref(), &request)?;
                debug!(session_id = %id, "Starting new session");
                SessionRecord::new(id, self.settings.store_blank)
            }
            Some(CookieContent {
                id,
                store: Some(store),
            }) => {
                debug!(session_id = %id, "Loaded session from cookie");
                SessionRecord::restore(id, store)
            }
            Some(CookieContent { id, store: None }) => {
                let store = self.fetch(&id).await?;
                debug!(session_id = %id, keys = store.len(), "Loaded session from cache");
                SessionRecord::restore(id, store)
            }
        };

        record.invalid_cookie = invalid_cookie;
        Ok(Some(Session::new(record, Arc::clone(self), request)))
    }

    /// Persist a record and tell the host what to do with the cookie
    pub async fn commit(&self, mut record: SessionRecord) -> SatchelResult<CookieDirective> {
        if !record.is_modified && !record.is_lazy {
            if record.invalid_cookie && self.settings.cookie.clear_invalid {
                debug!(session_id = %record.id, "Clearing invalid session cookie");
                return Ok(CookieDirective::Clear);
            }
            return Ok(CookieDirective::None);
        }

        if record.is_lazy {
            record.capture_lazy();
        }

        if self.settings.max_cookie_size > 0 {
            let content = CookieContent::embedded(&record.id, &record.store);
            let sealed = self.sealer.seal(&serde_json::to_value(&content)?).await?;

            if sealed.len() <= self.settings.max_cookie_size {
                debug!(
                    session_id = %record.id,
                    size = sealed.len(),
                    "Storing session in cookie"
                );
                return Ok(CookieDirective::Set(sealed));
            }

            debug!(
                session_id = %record.id,
                size = sealed.len(),
                max = self.settings.max_cookie_size,
                "Session too large for cookie, using cache"
            );
        }

        let reference = CookieContent::reference(&record.id);
        let sealed = self.sealer.seal(&serde_json::to_value(&reference)?).await?;

        if !self.cache.is_ready() {
            if !self.settings.error_on_cache_not_ready {
                warn!(session_id = %record.id, "Cache is not ready: not storing sessions to cache");
                return Ok(CookieDirective::Set(sealed));
            }
            return Err(cache_not_ready("commit"));
        }

        self.cache
            .set(&record.id, &record.store, self.settings.cache.ttl())
            .await?;
        debug!(session_id = %record.id, "Stored session in cache");

        Ok(CookieDirective::Set(sealed))
    }

    /// Invalidate a session out of band
    pub async fn revoke(&self, id: &str) -> SatchelResult<()> {
        self.cache.remove(id).await?;
        info!(session_id = %id, "Session revoked");
        Ok(())
    }

    pub(crate) fn generate_id(&self, request: &RequestContext) -> SatchelResult<String> {
        generate_checked(self.id_generator.as_ref(), request)
    }

    /// Drop a cache entry in the background; failures are only logged
    pub(crate) fn spawn_drop(&self, id: String) {
        let cache = Arc::clone(&self.cache);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = cache.remove(&id).await {
                        warn!(session_id = %id, error = %e, "Failed to drop reset session");
                    }
                });
            }
            Err(_) => {
                warn!(session_id = %id, "No async runtime: reset session was not dropped");
            }
        }
    }

    async fn read_cookie(&self, raw: &str) -> SatchelResult<(Option<CookieContent>, bool)> {
        match self.sealer.unseal(raw).await {
            Ok(value) => Ok((CookieContent::from_value(value), false)),
            Err(e) if self.settings.cookie.ignore_errors => {
                debug!(error = %e, "Ignoring invalid session cookie");
                Ok((None, true))
            }
            Err(e @ SatchelError::Cookie { .. }) => Err(e),
            Err(e) => Err(SatchelError::Cookie {
                message: "Failed to unseal session cookie".to_string(),
                source: Some(Box::new(e)),
                context: ErrorContext::new("session_manager").with_operation("load"),
            }),
        }
    }

    async fn fetch(&self, id: &str) -> SatchelResult<SessionStore> {
        if !self.cache.is_ready() {
            if !self.settings.error_on_cache_not_ready {
                warn!(session_id = %id, "Cache is not ready: not loading sessions from cache");
                return Ok(SessionStore::new());
            }
            return Err(cache_not_ready("load"));
        }

        Ok(self.cache.get(id).await?.unwrap_or_default())
    }
}

fn cache_not_ready(operation: &str) -> SatchelError {
    SatchelError::CacheNotReady {
        operation: operation.to_string(),
        context: ErrorContext::new("session_manager")
            .with_operation(operation)
            .with_suggestion("Set error_on_cache_not_ready = false to degrade instead of failing"),
    }
}

/// Registration-time assembly of a [`SessionManager`]
pub struct SessionManagerBuilder {
    settings: SessionSettings,
    cache: Option<Arc<dyn SessionCache>>,
    sealer: Option<Arc<dyn CookieSealer>>,
    id_generator: Option<SharedIdGenerator>,
}

impl SessionManagerBuilder {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            cache: None,
            sealer: None,
            id_generator: None,
        }
    }

    pub fn cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn sealer(mut self, sealer: Arc<dyn CookieSealer>) -> Self {
        self.sealer = Some(sealer);
        self
    }

    /// Use a custom id generator; it receives the request that starts the session
    pub fn id_generator<G: SessionIdGenerator + 'static>(mut self, generator: G) -> Self {
        self.id_generator = Some(Arc::new(generator));
        self
    }

    /// Validate settings and assemble the manager
    pub fn build(self) -> SatchelResult<Arc<SessionManager>> {
        self.settings.validate()?;

        let sealer = self.sealer.ok_or_else(|| SatchelError::Config {
            message: "A cookie sealer is required".to_string(),
            source: None,
            context: ErrorContext::new("session_manager").with_operation("build"),
        })?;

        let id_generator: SharedIdGenerator = match self.id_generator {
            Some(generator) => generator,
            None if self.settings.id_generator == ID_GENERATOR_CUSTOM => {
                return Err(SatchelError::Config {
                    message: "id_generator is \"custom\" but no generator function was registered"
                        .to_string(),
                    source: None,
                    context: ErrorContext::new("session_manager")
                        .with_operation("build")
                        .with_suggestion("Pass a generator to SessionManagerBuilder::id_generator"),
                });
            }
            None => Arc::new(UuidGenerator),
        };

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::default()));

        info!(
            cookie = %self.settings.name,
            max_cookie_size = self.settings.max_cookie_size,
            "Session manager registered"
        );

        Ok(Arc::new(SessionManager {
            settings: Arc::new(self.settings),
            cache,
            sealer,
            id_generator,
        }))
    }
}
