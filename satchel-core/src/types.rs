//! Core data type definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Session payload: arbitrary JSON values keyed by name
pub type SessionStore = Map<String, Value>;

/// Keys starting with this prefix belong to the engine
pub const RESERVED_PREFIX: char = '_';

/// Store key holding the flash buffer
pub const FLASH_KEY: &str = "_flash";

/// Store key listing the lazy-mode properties captured at commit
pub const LAZY_KEYS_KEY: &str = "_lazyKeys";

/// Whether a key is reserved for engine bookkeeping
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// Request metadata handed to id generators and used in logs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    /// Route pattern the request matched, when the host knows it
    pub matched_route: Option<String>,
    /// Lower-cased header names with their UTF-8 values
    pub headers: HashMap<String, String>,
}

impl RequestContext {
    pub fn new<M: Into<String>, P: Into<String>>(method: M, path: P) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_matched_route<S: Into<String>>(mut self, route: S) -> Self {
        self.matched_route = Some(route.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Cookie content before sealing
///
/// `{ id }` references a cache entry, `{ id, _store }` embeds the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieContent {
    pub id: String,
    #[serde(rename = "_store", default, skip_serializing_if = "Option::is_none")]
    pub store: Option<SessionStore>,
}

impl CookieContent {
    pub fn reference(id: &str) -> Self {
        Self {
            id: id.to_string(),
            store: None,
        }
    }

    pub fn embedded(id: &str, store: &SessionStore) -> Self {
        Self {
            id: id.to_string(),
            store: Some(store.clone()),
        }
    }

    /// Interpret an unsealed cookie value
    ///
    /// Anything other than an object with a non-empty string `id` is treated as no cookie.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut object) = value else {
            return None;
        };

        let id = match object.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => return None,
        };

        let store = match object.remove("_store") {
            Some(Value::Object(store)) => Some(store),
            _ => None,
        };

        Some(Self { id, store })
    }
}

/// What the host should do with the session cookie on the outgoing response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    /// Leave the client cookie untouched
    None,
    /// Set the cookie to this sealed value
    Set(String),
    /// Remove the cookie from the client
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cookie_content_from_value() {
        let content = CookieContent::from_value(json!({ "id": "abc" })).unwrap();
        assert_eq!(content, CookieContent::reference("abc"));

        let content =
            CookieContent::from_value(json!({ "id": "abc", "_store": { "a": 1 } })).unwrap();
        assert_eq!(content.store.unwrap()["a"], json!(1));
    }

    #[test]
    fn test_cookie_content_rejects_malformed() {
        assert!(CookieContent::from_value(json!(["id", "abc"])).is_none());
        assert!(CookieContent::from_value(json!({ "_store": {} })).is_none());
        assert!(CookieContent::from_value(json!({ "id": 42 })).is_none());
        assert!(CookieContent::from_value(json!({ "id": "" })).is_none());
    }

    #[test]
    fn test_reference_serializes_without_store() {
        let value = serde_json::to_value(CookieContent::reference("abc")).unwrap();
        assert_eq!(value, json!({ "id": "abc" }));
    }

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved_key(FLASH_KEY));
        assert!(is_reserved_key(LAZY_KEYS_KEY));
        assert!(!is_reserved_key("user"));
    }

    #[test]
    fn test_request_context_headers_are_case_insensitive() {
        let ctx = RequestContext::new("GET", "/").with_header("X-Tenant", "acme");
        assert_eq!(ctx.header("x-tenant"), Some("acme"));
    }
}
