//! Client events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// An event delivered from the client.
///
/// `target_id` names the handler to invoke. Every other field of the
/// payload (`type`, `value`, ...) is kept as-is for the handler to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub target_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Event {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Parse a raw payload. `target_id` must be a non-empty string.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let mut fields = match payload {
            Value::Object(fields) => fields,
            _ => return Err(Error::invalid_argument("event payload must be an object")),
        };

        let target_id = match fields.remove("target_id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::String(_)) => {
                return Err(Error::invalid_argument("target_id must not be empty"))
            }
            Some(_) => return Err(Error::invalid_argument("target_id must be a string")),
            None => return Err(Error::invalid_argument("event payload has no target_id")),
        };

        Ok(Self { target_id, fields })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The `value` field as a string, as sent by input elements.
    pub fn value_str(&self) -> Option<&str> {
        self.get("value").and_then(Value::as_str)
    }

    /// The DOM event type, e.g. `"click"`.
    pub fn kind(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_fields_are_kept() {
        let event = Event::from_payload(json!({
            "target_id": "h1",
            "type": "input",
            "value": "hello",
        }))
        .unwrap();

        assert_eq!(event.target_id, "h1");
        assert_eq!(event.kind(), Some("input"));
        assert_eq!(event.value_str(), Some("hello"));
        assert!(event.get("target_id").is_none());
    }

    #[test]
    fn target_id_is_required() {
        for payload in [
            json!({}),
            json!({"target_id": 7}),
            json!({"target_id": ""}),
            json!("click"),
        ] {
            assert!(matches!(
                Event::from_payload(payload),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn serializes_flat() {
        let event = Event::new("h").with_field("type", "click");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"target_id": "h", "type": "click"})
        );
    }
}
