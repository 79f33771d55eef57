//! Flash messages: values read once and then discarded
//!
//! Messages live in the store under [`FLASH_KEY`] as a mapping of flash type to
//! message list. Every flash call marks the session modified, reads included.

use crate::record::SessionRecord;
use crate::types::FLASH_KEY;
use serde_json::{Map, Value};

impl SessionRecord {
    fn take_flash_buffer(&mut self) -> Map<String, Value> {
        self.is_modified = true;

        match self.store.remove(FLASH_KEY) {
            Some(Value::Object(buffer)) => buffer,
            _ => Map::new(),
        }
    }

    fn put_flash_buffer(&mut self, buffer: Map<String, Value>) {
        self.store.insert(FLASH_KEY.to_string(), Value::Object(buffer));
    }

    /// Take every flash message of every type
    pub fn flash_all(&mut self) -> Map<String, Value> {
        let buffer = self.take_flash_buffer();
        self.put_flash_buffer(Map::new());
        buffer
    }

    /// Take the messages of one type; an unknown type yields an empty list
    pub fn flash_take(&mut self, kind: &str) -> Vec<Value> {
        let mut buffer = self.take_flash_buffer();
        let messages = into_messages(buffer.remove(kind));
        self.put_flash_buffer(buffer);
        messages
    }

    /// Append `message` to a type, or replace the type's messages when `is_override`
    ///
    /// A list message contributes its elements. Returns the messages now held for the type.
    pub fn flash(&mut self, kind: &str, message: Value, is_override: bool) -> Vec<Value> {
        let mut buffer = self.take_flash_buffer();

        let incoming = into_messages(Some(message));
        let messages = if is_override {
            incoming
        } else {
            let mut existing = into_messages(buffer.remove(kind));
            existing.extend(incoming);
            existing
        };

        buffer.insert(kind.to_string(), Value::Array(messages.clone()));
        self.put_flash_buffer(buffer);
        messages
    }
}

fn into_messages(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(messages)) => messages,
        Some(message) => vec![message],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> SessionRecord {
        SessionRecord::new("flash".to_string(), false)
    }

    #[test]
    fn test_append_then_take() {
        let mut record = record();
        record.flash("e", json!("m1"), false);
        let messages = record.flash("e", json!("m2"), false);
        assert_eq!(messages, vec![json!("m1"), json!("m2")]);

        assert_eq!(record.flash_take("e"), vec![json!("m1"), json!("m2")]);
        assert!(record.flash_take("e").is_empty());
    }

    #[test]
    fn test_override_replaces() {
        let mut record = record();
        record.flash("t", json!("a"), true);
        record.flash("t", json!("b"), true);
        assert_eq!(record.flash_take("t"), vec![json!("b")]);
    }

    #[test]
    fn test_list_message_is_concatenated() {
        let mut record = record();
        record.flash("info", json!("a"), false);
        let messages = record.flash("info", json!(["b", "c"]), false);
        assert_eq!(messages, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn test_flash_all_consumes_everything() {
        let mut record = record();
        record.flash("error", json!("bad"), false);
        record.flash("info", json!("ok"), false);

        let all = record.flash_all();
        assert_eq!(all["error"], json!(["bad"]));
        assert_eq!(all["info"], json!(["ok"]));
        assert!(record.flash_all().is_empty());
    }

    #[test]
    fn test_reads_mark_modified() {
        let mut record = record();
        assert!(record.flash_take("nothing").is_empty());
        assert!(record.is_modified());
        assert_eq!(record.store()[FLASH_KEY], json!({}));
    }
}
