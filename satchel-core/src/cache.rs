//! In-process session cache
//!
//! TTL-aware store with LRU eviction and a readiness switch, used as the default
//! [`SessionCache`] and in tests.

use crate::error::{ErrorContext, SatchelError, SatchelResult};
use crate::traits::SessionCache;
use crate::types::SessionStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    store: SessionStore,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl CacheEntry {
    fn new(store: SessionStore, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            store,
            expires_at: ttl.map(|duration| now + duration),
            last_accessed: now,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() > expires_at)
            .unwrap_or(false)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub max_size: usize,
}

/// In-memory session cache with TTL and LRU eviction
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ready: Arc<AtomicBool>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    max_size: usize,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    /// `default_ttl` applies when a write passes a zero TTL; None keeps entries until evicted
    pub fn new(max_size: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(AtomicBool::new(true)),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            max_size,
            default_ttl,
        }
    }

    /// Flip the readiness flag reported through [`SessionCache::is_ready`]
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
        info!(ready, "Session cache readiness changed");
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries
            .read()
            .map(|e| e.get(id).is_some_and(|entry| !entry.is_expired()))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStats {
        let (total_entries, expired_entries) = self
            .entries
            .read()
            .map(|e| (e.len(), e.values().filter(|entry| entry.is_expired()).count()))
            .unwrap_or((0, 0));

        CacheStats {
            total_entries,
            expired_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            max_size: self.max_size,
        }
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };

        let initial_size = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        initial_size - entries.len()
    }

    /// Periodically purge expired entries on the current tokio runtime
    pub fn start_cleanup_task(&self, period: Duration) -> JoinHandle<()> {
        let cache = self.clone();

        tokio::spawn(async move {
            let mut interval = interval(period);

            loop {
                interval.tick().await;

                let removed_count = cache.purge_expired();
                if removed_count > 0 {
                    info!("Session cache cleanup: removed {} expired entries", removed_count);
                }
            }
        })
    }

    fn evict_lru(entries: &mut HashMap<String, CacheEntry>) {
        let lru_key = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            entries.remove(&key);
            debug!("Evicted LRU session: {}", key);
        }
    }

    fn poisoned(operation: &str) -> SatchelError {
        SatchelError::Backend {
            message: "Session cache lock poisoned".to_string(),
            source: None,
            context: ErrorContext::new("memory_cache").with_operation(operation),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000, None)
    }
}

#[async_trait]
impl SessionCache for MemoryCache {
    async fn get(&self, id: &str) -> SatchelResult<Option<SessionStore>> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("get"))?;

        let expired = entries.get(id).map(CacheEntry::is_expired);
        if expired == Some(true) {
            entries.remove(id);
            debug!("Session entry expired and removed: {}", id);
        }

        match entries.get_mut(id) {
            Some(entry) => {
                entry.last_accessed = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.store.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Session cache miss: {}", id);
                Ok(None)
            }
        }
    }

    async fn set(&self, id: &str, store: &SessionStore, ttl: Duration) -> SatchelResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("set"))?;

        if entries.len() >= self.max_size && !entries.contains_key(id) {
            Self::evict_lru(&mut entries);
        }

        let ttl = if ttl.is_zero() { self.default_ttl } else { Some(ttl) };
        entries.insert(id.to_string(), CacheEntry::new(store.clone(), ttl));

        Ok(())
    }

    async fn remove(&self, id: &str) -> SatchelResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("remove"))?;
        entries.remove(id);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
