//! Persisted resource document: payload plus its `lastModified` stamp.
//!
//! Canonical shape, identical on both backends:
//!
//! ```json
//! { "data": [ ... ], "lastModified": 1718000000000 }
//! ```
//!
//! Older writers put `lastModified` directly inside an object payload, and the oldest ones wrote
//! bare payloads. Both still parse; an absent stamp reads as `0`.

use serde_json::{Map, Value};

/// Field holding the payload in the canonical shape.
pub const DATA_FIELD: &str = "data";
/// Field holding the epoch-millisecond stamp.
pub const LAST_MODIFIED_FIELD: &str = "lastModified";

#[derive(Debug, Clone, PartialEq)]
/// A resource payload together with its modification stamp.
pub struct ResourceDocument {
    /// Caller-visible payload.
    pub data: Value,
    /// Epoch milliseconds of the write that produced this document.
    pub last_modified: u64,
}

fn stamp_of(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|ms| ms.max(0.0) as u64))
}

impl ResourceDocument {
    /// Creates a document.
    pub fn new(data: Value, last_modified: u64) -> Self {
        Self {
            data,
            last_modified,
        }
    }

    /// Interprets a stored JSON value, accepting canonical, inline-stamped, and bare shapes.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut object) = value else {
            return Self::new(value, 0);
        };
        let Some(last_modified) = object.get(LAST_MODIFIED_FIELD).and_then(stamp_of) else {
            return Self::new(Value::Object(object), 0);
        };

        if object.len() == 2 && object.contains_key(DATA_FIELD) {
            let data = object.remove(DATA_FIELD).unwrap_or(Value::Null);
            return Self::new(data, last_modified);
        }
        object.remove(LAST_MODIFIED_FIELD);
        Self::new(Value::Object(object), last_modified)
    }

    /// Renders the canonical shape.
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(2);
        object.insert(DATA_FIELD.to_string(), self.data.clone());
        object.insert(
            LAST_MODIFIED_FIELD.to_string(),
            Value::from(self.last_modified),
        );
        Value::Object(object)
    }

    /// Parses file text.
    ///
    /// # Errors
    ///
    /// Returns the JSON parse error message.
    pub fn from_json_text(text: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Ok(Self::from_value(value))
    }

    /// Renders file text (pretty-printed UTF-8 JSON).
    ///
    /// # Errors
    ///
    /// Returns the serialization error message.
    pub fn to_json_text(&self) -> Result<String, String> {
        serde_json::to_string_pretty(&self.to_value()).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_shape_round_trips_arrays_and_objects() {
        for data in [json!([{"id": 1}, {"id": 2}]), json!({"answered": 3}), json!(null)] {
            let doc = ResourceDocument::new(data.clone(), 42);
            let text = doc.to_json_text().expect("render");
            assert_eq!(ResourceDocument::from_json_text(&text).expect("parse"), doc);
            assert_eq!(doc.to_value()["lastModified"], json!(42));
        }
    }

    #[test]
    fn inline_stamped_objects_lose_only_the_stamp() {
        let doc = ResourceDocument::from_value(json!({
            "total": 10,
            "data": "kept",
            "lastModified": 7
        }));
        assert_eq!(doc.last_modified, 7);
        assert_eq!(doc.data, json!({"total": 10, "data": "kept"}));
    }

    #[test]
    fn bare_payloads_read_with_zero_stamp() {
        assert_eq!(
            ResourceDocument::from_value(json!(["a", "b"])),
            ResourceDocument::new(json!(["a", "b"]), 0)
        );
        let unstamped = json!({"data": [1], "lastModified": "yesterday"});
        assert_eq!(
            ResourceDocument::from_value(unstamped.clone()),
            ResourceDocument::new(unstamped, 0)
        );
    }

    #[test]
    fn float_stamps_are_accepted() {
        let doc = ResourceDocument::from_value(json!({"data": [], "lastModified": 1700000000000.0}));
        assert_eq!(doc.last_modified, 1_700_000_000_000);
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(ResourceDocument::from_json_text("{\"data\": ").is_err());
    }
}
