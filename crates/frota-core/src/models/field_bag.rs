//! Field bag returned by document-understanding services.
//!
//! Vendors disagree on shapes: a label may map to a list or to a single
//! scalar, entries may be numbers or nulls. Everything is validated into
//! `label -> ordered list of optional strings` on entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Label to ordered candidate values. Order inside a list is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawFieldBag(BTreeMap<String, Vec<Option<String>>>);

impl RawFieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the values for a label.
    pub fn insert<I, S>(&mut self, label: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.insert(
            label.into(),
            values.into_iter().map(|v| Some(v.into())).collect(),
        );
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<I, S>(mut self, label: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(label, values);
        self
    }

    /// Append one value to a label.
    pub fn push(&mut self, label: impl Into<String>, value: Option<String>) {
        self.0.entry(label.into()).or_default().push(value);
    }

    /// Place a value at `index`, padding the list with nulls if it is shorter.
    fn push_at(&mut self, label: &str, index: usize, value: Option<String>) {
        let bucket = self.0.entry(label.to_string()).or_default();
        if bucket.len() < index {
            bucket.resize(index, None);
        }
        bucket.push(value);
    }

    pub fn get(&self, label: &str) -> Option<&[Option<String>]> {
        self.0.get(label).map(|v| v.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First non-empty value, scanning aliases in order and stopping at the
    /// first bucket that has one.
    pub fn first_non_empty(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.get(alias)?
                .iter()
                .flatten()
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
        })
    }

    /// First bucket among `aliases` holding at least one non-empty value.
    pub fn column(&self, aliases: &[&str]) -> Option<&[Option<String>]> {
        aliases.iter().find_map(|alias| {
            self.get(alias).filter(|bucket| {
                bucket
                    .iter()
                    .flatten()
                    .any(|v| !v.trim().is_empty())
            })
        })
    }

    /// Build a bag from Document-AI style entities.
    ///
    /// Each entity contributes its text under its `type`. Nested `properties`
    /// are aligned to their parent's index so that columns such as
    /// `line_item/description` and `line_item/quantity` line up per row.
    pub fn from_entities(entities: &[Value]) -> Self {
        let mut bag = RawFieldBag::new();

        for entity in entities {
            let Some(label) = entity.get("type").and_then(Value::as_str) else {
                continue;
            };

            let index = bag.get(label).map_or(0, |b| b.len());
            bag.push(label, entity_text(entity));

            if let Some(properties) = entity.get("properties").and_then(Value::as_array) {
                for property in properties {
                    if let Some(child) = property.get("type").and_then(Value::as_str) {
                        bag.push_at(child, index, entity_text(property));
                    }
                }
            }
        }

        bag
    }
}

/// Text of an entity, preferring the service's normalized value over the raw mention.
fn entity_text(entity: &Value) -> Option<String> {
    entity
        .get("normalizedValue")
        .and_then(|n| n.get("text"))
        .and_then(Value::as_str)
        .or_else(|| entity.get("mentionText").and_then(Value::as_str))
        .map(|s| s.trim().to_string())
}

/// Convert one JSON entry into a bag value.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(obj) => ["value", "mentionText", "text", "content"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(value_to_text))
            .or_else(|| Some(value.to_string())),
        Value::Array(_) => Some(value.to_string()),
    }
}

impl<'de> Deserialize<'de> for RawFieldBag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();

        let map = raw
            .into_iter()
            .map(|(label, value)| {
                let values = match value {
                    Value::Array(items) => items.iter().map(value_to_text).collect(),
                    Value::Null => Vec::new(),
                    other => vec![value_to_text(&other)],
                };
                (label, values)
            })
            .collect();

        Ok(RawFieldBag(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_deserialize_mixed_shapes() {
        let bag: RawFieldBag = serde_json::from_value(json!({
            "invoice_id": ["000123"],
            "total_amount": 1500.5,
            "line_item/quantity": [2, null, "3"],
            "empty": null
        }))
        .unwrap();

        assert_eq!(bag.get("invoice_id"), Some(&[Some("000123".to_string())][..]));
        assert_eq!(bag.get("total_amount"), Some(&[Some("1500.5".to_string())][..]));
        assert_eq!(
            bag.get("line_item/quantity"),
            Some(&[Some("2".to_string()), None, Some("3".to_string())][..])
        );
        assert_eq!(bag.get("empty"), Some(&[][..]));
    }

    #[test]
    fn test_serialize_keeps_nulls() {
        let mut bag = RawFieldBag::new();
        bag.push("codes", Some("A1".to_string()));
        bag.push("codes", None);

        assert_eq!(serde_json::to_value(&bag).unwrap(), json!({"codes": ["A1", null]}));
    }

    #[test]
    fn test_first_non_empty_respects_alias_order() {
        let bag = RawFieldBag::new()
            .with("nro", ["  ", "77"])
            .with("invoice_id", ["", ""]);

        // invoice_id bucket is all blank, so the lookup moves on to nro
        assert_eq!(bag.first_non_empty(&["invoice_id", "nro"]), Some("77"));
        assert_eq!(bag.first_non_empty(&["missing"]), None);
    }

    #[test]
    fn test_column_skips_blank_buckets() {
        let bag = RawFieldBag::new()
            .with("a", [""])
            .with("b", ["x", "y"]);

        assert_eq!(bag.column(&["a", "b"]).map(|c| c.len()), Some(2));
        assert!(bag.column(&["a"]).is_none());
    }

    #[test]
    fn test_from_entities_aligns_properties() {
        let entities = vec![
            json!({"type": "invoice_id", "mentionText": "000123"}),
            json!({"type": "invoice_date", "mentionText": "01/02/2024",
                   "normalizedValue": {"text": "2024-02-01"}}),
            json!({"type": "line_item", "mentionText": "P1 Widget 2",
                   "properties": [
                       {"type": "line_item/product_code", "mentionText": "P1"},
                       {"type": "line_item/description", "mentionText": "Widget"}
                   ]}),
            json!({"type": "line_item", "mentionText": "Gadget 1",
                   "properties": [
                       {"type": "line_item/description", "mentionText": "Gadget"}
                   ]}),
            json!({"type": "line_item", "mentionText": "P3 Gizmo",
                   "properties": [
                       {"type": "line_item/product_code", "mentionText": "P3"}
                   ]}),
        ];

        let bag = RawFieldBag::from_entities(&entities);

        assert_eq!(bag.first_non_empty(&["invoice_id"]), Some("000123"));
        assert_eq!(bag.first_non_empty(&["invoice_date"]), Some("2024-02-01"));
        assert_eq!(
            bag.get("line_item/product_code"),
            Some(&[Some("P1".to_string()), None, Some("P3".to_string())][..])
        );
        assert_eq!(bag.get("line_item").map(|c| c.len()), Some(3));
    }
}
