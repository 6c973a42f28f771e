//! Schema-less JSON fields stored next to projects and calculations.
//!
//! `metadata` and `financial_data` are JSONB columns upstream, but rows
//! written by older services hold them as JSON text, and some hold garbage.
//! [`StoredJson`] keeps exactly what the store returned; [`FieldMap`] is the
//! decoded key/value view used for rendering. Decoding never fails: anything
//! that is not a JSON object becomes the empty map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON column exactly as read from the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StoredJson {
    /// SQL NULL.
    #[default]
    Absent,
    /// JSON carried as text that still has to be parsed.
    Text(String),
    /// Already-structured JSON.
    Structured(Value),
}

impl StoredJson {
    /// Wrap a column value. String values are treated as JSON text.
    pub fn from_column(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => StoredJson::Absent,
            Some(Value::String(text)) => StoredJson::Text(text),
            Some(other) => StoredJson::Structured(other),
        }
    }

    /// Decode into a map, recovering from every malformed shape.
    pub fn to_field_map(&self) -> FieldMap {
        match self {
            StoredJson::Absent => FieldMap::new(),
            StoredJson::Text(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => FieldMap(map),
                _ => FieldMap::new(),
            },
            StoredJson::Structured(Value::Object(map)) => FieldMap(map.clone()),
            StoredJson::Structured(_) => FieldMap::new(),
        }
    }

    /// Value for data exports: structured where possible, verbatim text
    /// when the text does not parse, explicit null when absent.
    pub fn to_export_value(&self) -> Value {
        match self {
            StoredJson::Absent => Value::Null,
            StoredJson::Text(text) => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
            }
            StoredJson::Structured(value) => value.clone(),
        }
    }
}

impl From<Value> for StoredJson {
    fn from(value: Value) -> Self {
        StoredJson::from_column(Some(value))
    }
}

/// Decoded key/value view over a stored JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(Map<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl FromIterator<(String, Value)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_json_is_parsed() {
        let stored = StoredJson::Text(r#"{"panel":"mono","count":12}"#.into());
        let map = stored.to_field_map();
        assert_eq!(map.get("panel"), Some(&json!("mono")));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_malformed_text_becomes_empty() {
        assert!(StoredJson::Text("{not json".into()).to_field_map().is_empty());
        assert!(StoredJson::Text("[1,2,3]".into()).to_field_map().is_empty());
        assert!(StoredJson::Structured(json!(42)).to_field_map().is_empty());
        assert!(StoredJson::Absent.to_field_map().is_empty());
    }

    #[test]
    fn test_from_column_treats_strings_as_text() {
        assert_eq!(
            StoredJson::from_column(Some(json!("{}"))),
            StoredJson::Text("{}".into())
        );
        assert_eq!(StoredJson::from_column(Some(Value::Null)), StoredJson::Absent);
        assert_eq!(StoredJson::from_column(None), StoredJson::Absent);
    }

    #[test]
    fn test_export_value_keeps_unparseable_text_verbatim() {
        assert_eq!(
            StoredJson::Text("oops".into()).to_export_value(),
            json!("oops")
        );
        assert_eq!(
            StoredJson::Text(r#"{"key":"value"}"#.into()).to_export_value(),
            json!({"key": "value"})
        );
        assert_eq!(StoredJson::Absent.to_export_value(), Value::Null);
    }
}
