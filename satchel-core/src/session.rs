//! Request-facing session handle
//!
//! Cheap to clone; every clone refers to the same record for the lifetime of one
//! request. All operations are synchronous and in-memory, only [`Session::commit`]
//! touches the cookie codec and the cache.

use crate::error::SatchelResult;
use crate::lifecycle::SessionManager;
use crate::record::SessionRecord;
use crate::types::{CookieDirective, RequestContext};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    record: Mutex<SessionRecord>,
    manager: Arc<SessionManager>,
    request: RequestContext,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let record = self.record();
        f.debug_struct("Session")
            .field("id", &record.id())
            .field("is_modified", &record.is_modified())
            .field("is_lazy", &record.is_lazy())
            .finish()
    }
}

impl Session {
    pub(crate) fn new(
        record: SessionRecord,
        manager: Arc<SessionManager>,
        request: RequestContext,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                record: Mutex::new(record),
                manager,
                request,
            }),
        }
    }

    fn record(&self) -> MutexGuard<'_, SessionRecord> {
        // Record operations never leave it half-updated, so a poisoned lock is still usable
        self.inner
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.inner.manager
    }

    pub fn request(&self) -> &RequestContext {
        &self.inner.request
    }

    pub fn id(&self) -> String {
        self.record().id().to_string()
    }

    /// Copy of the current record state
    pub fn snapshot(&self) -> SessionRecord {
        self.record().clone()
    }

    pub fn is_modified(&self) -> bool {
        self.record().is_modified()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.record().get(key, false)
    }

    /// Read a key and remove it in the same step
    pub fn take(&self, key: &str) -> Option<Value> {
        self.record().get(key, true)
    }

    /// Typed read; `Ok(None)` when the key is absent
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> SatchelResult<Option<T>> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn set_one<T: Serialize>(&self, key: &str, value: T) -> SatchelResult<Value> {
        self.record().set_one(key, value)
    }

    pub fn set_many<T: Serialize>(&self, values: T) -> SatchelResult<Map<String, Value>> {
        self.record().set_many(values)
    }

    pub fn clear(&self, key: &str) {
        self.record().clear(key)
    }

    pub fn touch(&self) {
        self.record().touch()
    }

    /// Start over with a new id and an empty store
    ///
    /// The previous id is dropped from the cache in the background. Returns the new id.
    pub fn reset(&self) -> SatchelResult<String> {
        let new_id = self.inner.manager.generate_id(&self.inner.request)?;
        let old_id = self.record().reset(new_id.clone());

        debug!(old = %old_id, new = %new_id, "Session reset");
        self.inner.manager.spawn_drop(old_id);

        Ok(new_id)
    }

    pub fn lazy(&self, enabled: bool) {
        self.record().lazy(enabled)
    }

    pub fn is_lazy(&self) -> bool {
        self.record().is_lazy()
    }

    pub fn extra(&self, key: &str) -> Option<Value> {
        self.record().extra(key).cloned()
    }

    pub fn set_extra<T: Serialize>(&self, key: &str, value: T) -> SatchelResult<()> {
        self.record().set_extra(key, value)
    }

    pub fn remove_extra(&self, key: &str) -> Option<Value> {
        self.record().remove_extra(key)
    }

    pub fn flash_all(&self) -> Map<String, Value> {
        self.record().flash_all()
    }

    pub fn flash_take(&self, kind: &str) -> Vec<Value> {
        self.record().flash_take(kind)
    }

    pub fn flash<T: Serialize>(
        &self,
        kind: &str,
        message: T,
        is_override: bool,
    ) -> SatchelResult<Vec<Value>> {
        let message = serde_json::to_value(message)?;
        Ok(self.record().flash(kind, message, is_override))
    }

    pub fn is_committed(&self) -> bool {
        self.record().is_committed()
    }

    /// Persist the session once; later calls for the same request do nothing
    pub async fn commit(&self) -> SatchelResult<CookieDirective> {
        let snapshot = {
            let mut record = self.record();
            if record.committed {
                return Ok(CookieDirective::None);
            }
            record.committed = true;
            record.clone()
        };

        self.inner.manager.commit(snapshot).await
    }
}
