//! In-memory session state for one request

use crate::error::{SatchelError, SatchelResult};
use crate::types::{is_reserved_key, SessionStore, LAZY_KEYS_KEY};
use crate::usage_error;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Session state owned by a single in-flight request
#[derive(Debug, Clone, Default)]
pub struct SessionRecord {
    pub(crate) id: String,
    pub(crate) store: SessionStore,
    /// Lazy-mode properties, captured into the store at commit
    pub(crate) extras: Map<String, Value>,
    pub(crate) is_modified: bool,
    pub(crate) is_lazy: bool,
    /// Incoming cookie failed to unseal and should be cleared client-side
    pub(crate) invalid_cookie: bool,
    pub(crate) committed: bool,
}

impl SessionRecord {
    /// Brand-new session with an empty store
    pub fn new(id: String, is_modified: bool) -> Self {
        Self {
            id,
            is_modified,
            ..Self::default()
        }
    }

    /// Session rebuilt from a cookie or the cache
    ///
    /// A `_lazyKeys` marker moves the listed keys out of the store into the
    /// lazy-mode properties and turns lazy mode back on.
    pub fn restore(id: String, mut store: SessionStore) -> Self {
        let mut extras = Map::new();
        let mut is_lazy = false;

        if let Some(marker) = store.remove(LAZY_KEYS_KEY) {
            is_lazy = true;
            if let Value::Array(keys) = marker {
                for key in keys.iter().filter_map(Value::as_str) {
                    if let Some(value) = store.remove(key) {
                        extras.insert(key.to_string(), value);
                    }
                }
            }
            debug!(session_id = %id, keys = extras.len(), "Rehydrated lazy session properties");
        }

        Self {
            id,
            store,
            extras,
            is_lazy,
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn is_lazy(&self) -> bool {
        self.is_lazy
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Stored value, or None when absent; `clear` removes the key after reading
    pub fn get(&mut self, key: &str, clear: bool) -> Option<Value> {
        let value = self.store.get(key).cloned();

        if clear {
            self.clear(key);
        }

        value
    }

    /// Store one value and return it
    pub fn set_one<T: Serialize>(&mut self, key: &str, value: T) -> SatchelResult<Value> {
        Self::check_key(key)?;
        let value = serde_json::to_value(value)?;

        self.is_modified = true;
        self.store.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Store every top-level entry of a mapping and return the mapping
    pub fn set_many<T: Serialize>(&mut self, values: T) -> SatchelResult<Map<String, Value>> {
        let Value::Object(values) = serde_json::to_value(values)? else {
            return Err(usage_error!(
                "Invalid set_many() arguments: expected a mapping of keys to values",
                "session_record",
                "set_many"
            ));
        };

        for key in values.keys() {
            Self::check_key(key)?;
        }

        self.is_modified = true;
        for (key, value) in &values {
            self.store.insert(key.clone(), value.clone());
        }

        Ok(values)
    }

    /// Remove a key; missing keys are fine
    pub fn clear(&mut self, key: &str) {
        self.is_modified = true;
        self.store.remove(key);
    }

    /// Mark the session for persistence without changing it
    pub fn touch(&mut self) {
        self.is_modified = true;
    }

    /// Swap in a fresh id and empty store, returning the previous id
    pub fn reset(&mut self, new_id: String) -> String {
        self.is_modified = true;
        self.store = SessionStore::new();
        std::mem::replace(&mut self.id, new_id)
    }

    pub fn lazy(&mut self, enabled: bool) {
        self.is_lazy = enabled;
    }

    /// Lazy-mode property
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// Set a lazy-mode property, persisted at commit while lazy mode is on
    pub fn set_extra<T: Serialize>(&mut self, key: &str, value: T) -> SatchelResult<()> {
        let value = serde_json::to_value(value)?;
        self.extras.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove_extra(&mut self, key: &str) -> Option<Value> {
        self.extras.remove(key)
    }

    pub fn extras(&self) -> &Map<String, Value> {
        &self.extras
    }

    /// Copy lazy-mode properties into the store and record their names
    ///
    /// Reserved-prefix properties and `id` are never captured.
    pub(crate) fn capture_lazy(&mut self) {
        let mut lazy_keys = Vec::new();

        for (key, value) in &self.extras {
            if key == "id" || is_reserved_key(key) {
                continue;
            }
            lazy_keys.push(Value::String(key.clone()));
            self.store.insert(key.clone(), value.clone());
        }

        if lazy_keys.is_empty() {
            self.store.remove(LAZY_KEYS_KEY);
        } else {
            self.store
                .insert(LAZY_KEYS_KEY.to_string(), Value::Array(lazy_keys));
        }
    }

    fn check_key(key: &str) -> SatchelResult<()> {
        if key.is_empty() {
            return Err(usage_error!("Missing key", "session_record", "set"));
        }

        if is_reserved_key(key) {
            return Err(SatchelError::Usage {
                message: format!("Key {:?} uses the reserved '_' prefix", key),
                context: crate::ErrorContext::new("session_record").with_operation("set"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> SessionRecord {
        SessionRecord::new("id-1".to_string(), false)
    }

    #[test]
    fn test_get_missing_is_none() {
        let mut record = record();
        assert_eq!(record.get("missing", false), None);
        assert!(!record.is_modified());
    }

    #[test]
    fn test_falsy_values_survive() {
        let mut record = record();
        record.set_one("f", false).unwrap();
        record.set_one("z", 0).unwrap();
        record.set_one("s", "").unwrap();
        record.set_one("a", Vec::<i32>::new()).unwrap();

        assert_eq!(record.get("f", false), Some(json!(false)));
        assert_eq!(record.get("z", false), Some(json!(0)));
        assert_eq!(record.get("s", false), Some(json!("")));
        assert_eq!(record.get("a", false), Some(json!([])));
    }

    #[test]
    fn test_set_one_returns_value_and_marks_modified() {
        let mut record = record();
        let value = record.set_one("some", json!({ "value": "2" })).unwrap();
        assert_eq!(value, json!({ "value": "2" }));
        assert!(record.is_modified());
    }

    #[test]
    fn test_set_many_returns_mapping() {
        let mut record = record();
        let values = record
            .set_many(json!({ "one": 1, "two": "2" }))
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(record.get("two", false), Some(json!("2")));
    }

    #[test]
    fn test_bad_set_arguments() {
        let mut record = record();
        assert!(matches!(
            record.set_one("", 1),
            Err(SatchelError::Usage { .. })
        ));
        assert!(record.set_one("_flash", 1).is_err());
        assert!(record.set_many(json!([1, 2])).is_err());
        assert!(record.set_many(json!(5)).is_err());
        assert!(record.set_many(json!({ "ok": 1, "_bad": 2 })).is_err());
        // rejected calls leave the record untouched
        assert!(!record.is_modified());
        assert_eq!(record.get("ok", false), None);
    }

    #[test]
    fn test_get_with_clear_removes_within_request() {
        let mut record = record();
        record.set_one("k", "v").unwrap();

        assert_eq!(record.get("k", true), Some(json!("v")));
        assert_eq!(record.get("k", false), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut record = record();
        record.clear("k");
        record.clear("k");
        assert!(record.store().is_empty());
        assert!(record.is_modified());
    }

    #[test]
    fn test_touch_marks_modified() {
        let mut record = record();
        record.touch();
        assert!(record.is_modified());
        assert!(record.store().is_empty());
    }

    #[test]
    fn test_reset_swaps_identity() {
        let mut record = record();
        record.set_one("k", "v").unwrap();

        let old = record.reset("id-2".to_string());
        assert_eq!(old, "id-1");
        assert_eq!(record.id(), "id-2");
        assert!(record.store().is_empty());
        assert!(record.is_modified());
    }

    #[test]
    fn test_lazy_capture_and_restore() {
        let mut record = record();
        record.lazy(true);
        record.set_extra("custom", json!({ "v": 1 })).unwrap();
        record.set_extra("_hidden", json!(3)).unwrap();
        record.capture_lazy();

        assert_eq!(record.store()[LAZY_KEYS_KEY], json!(["custom"]));
        assert!(!record.store().contains_key("_hidden"));

        let restored = SessionRecord::restore("id-1".to_string(), record.store().clone());
        assert!(restored.is_lazy());
        assert_eq!(restored.extra("custom"), Some(&json!({ "v": 1 })));
        assert!(restored.store().is_empty());
        assert_eq!(restored.extra("_hidden"), None);
    }

    #[test]
    fn test_lazy_capture_without_keys_omits_marker() {
        let mut record = record();
        record.lazy(true);
        record.capture_lazy();
        assert!(!record.store().contains_key(LAZY_KEYS_KEY));
    }
}
