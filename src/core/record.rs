use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::value::Value;

/// Ordered field -> value mapping returned by read operations.
///
/// `id` is always present and always the first field, regardless of the
/// requested projection. Serializes to a JSON object preserving field order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    #[must_use]
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Record id. Every record carries one by construction.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.entries.first().and_then(|(_, value)| value.as_int())
    }

    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new(vec![
            ("id".to_string(), Value::Integer(3)),
            ("name".to_string(), Value::Text("Onnymm Azzur".to_string())),
            ("active".to_string(), Value::Boolean(true)),
        ])
    }

    #[test]
    fn test_get_and_id() {
        let record = sample();
        assert_eq!(record.id(), Some(3));
        assert_eq!(
            record.get("name"),
            Some(&Value::Text("Onnymm Azzur".to_string()))
        );
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_field_order_preserved() {
        let record = sample();
        assert_eq!(record.fields(), vec!["id", "name", "active"]);
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"id":3,"name":"Onnymm Azzur","active":true}"#);
    }
}
