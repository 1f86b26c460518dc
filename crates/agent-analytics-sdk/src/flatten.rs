//! Entity flattening into span event attributes.
//!
//! Span sinks accept only strings, booleans, integers and floats. The
//! [`Flattener`] turns an entity's field registry into such a flat map:
//! base fields verbatim, `attr_<key>` for open attributes, structural
//! fields under their own keys and every remaining field under a
//! per-type prefix. Null values never reach the map.

use agent_analytics_core::{Element, FieldValue, Fields};
use agent_analytics_span::{AttrValue, Attributes};
use std::collections::{BTreeMap, HashSet};

const BASE_FIELDS: [&str; 5] = ["id", "type", "owner_id", "name", "description"];

/// Normalize a field value into a sink-acceptable scalar.
///
/// Returns `None` for null values.
pub fn normalize(value: &FieldValue) -> Option<AttrValue> {
    let normalized = match value {
        FieldValue::Null => return None,
        FieldValue::Bool(b) => AttrValue::Bool(*b),
        FieldValue::Int(i) => AttrValue::I64(*i),
        FieldValue::Float(x) => AttrValue::F64(*x),
        FieldValue::Str(s) | FieldValue::Label(s) | FieldValue::Rendered(s) => {
            AttrValue::String(s.clone())
        }
        FieldValue::Timestamp(t) => AttrValue::String(t.to_rfc3339()),
        FieldValue::List(items) if items.iter().all(is_scalar) => {
            let joined: Vec<String> = items
                .iter()
                .filter_map(normalize)
                .map(|item| item.to_string())
                .collect();
            AttrValue::String(joined.join(", "))
        }
        FieldValue::List(items) => {
            let json = items
                .iter()
                .map(nested_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array);
            AttrValue::String(encode_or_render(json, value))
        }
        FieldValue::Map(map) => {
            let json = map
                .iter()
                .map(|(k, v)| nested_json(v).map(|v| (k.clone(), v)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object);
            AttrValue::String(encode_or_render(json, value))
        }
        FieldValue::Dump(json) => AttrValue::String(json.to_string()),
    };
    Some(normalized)
}

fn is_scalar(value: &FieldValue) -> bool {
    value.is_primitive() || matches!(value, FieldValue::Label(_))
}

/// JSON form of a normalized nested value; `None` when it has no JSON
/// representation (non-finite floats).
fn nested_json(value: &FieldValue) -> Option<serde_json::Value> {
    match normalize(value) {
        None => Some(serde_json::Value::Null),
        Some(AttrValue::Bool(b)) => Some(serde_json::Value::Bool(b)),
        Some(AttrValue::I64(i)) => Some(serde_json::Value::from(i)),
        Some(AttrValue::F64(x)) => serde_json::Number::from_f64(x).map(serde_json::Value::Number),
        Some(AttrValue::String(s)) => Some(serde_json::Value::String(s)),
    }
}

fn encode_or_render(json: Option<serde_json::Value>, value: &FieldValue) -> String {
    json.and_then(|j| serde_json::to_string(&j).ok())
        .unwrap_or_else(|| render(value))
}

/// Best-effort textual rendering used when JSON encoding fails
fn render(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "null".to_string(),
        FieldValue::List(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        FieldValue::Map(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, render(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        other => normalize(other).map(|v| v.to_string()).unwrap_or_default(),
    }
}

/// Accumulates the flat attribute map of one entity
#[derive(Debug, Default)]
pub struct Flattener {
    attributes: Attributes,
    handled: HashSet<&'static str>,
}

impl Flattener {
    /// Start from the base element: identity fields, tags and `attr_<key>`
    pub fn new(element: &Element) -> Self {
        let mut flat = Self::default();
        let base: BTreeMap<&str, FieldValue> = element.fields().into_iter().collect();

        for key in BASE_FIELDS {
            if let Some(value) = base.get(key) {
                flat.put(key, value.clone());
            }
        }
        if let Some(tags) = base.get("tags") {
            flat.put("tags", tags.clone());
        }
        flat.skip("attributes");
        for (key, value) in &element.attributes {
            if let Some(value) = normalize(&FieldValue::from(value)) {
                flat.attributes.insert(format!("attr_{}", key), value);
            }
        }
        flat
    }

    /// Emit a structural field under its own key
    pub fn put(&mut self, key: &'static str, value: impl Into<FieldValue>) {
        self.handled.insert(key);
        if let Some(value) = normalize(&value.into()) {
            self.attributes.insert(key.to_string(), value);
        }
    }

    /// Emit a structural field under a different key
    pub fn put_as(&mut self, field: &'static str, key: &str, value: impl Into<FieldValue>) {
        self.handled.insert(field);
        if let Some(value) = normalize(&value.into()) {
            self.attributes.insert(key.to_string(), value);
        }
    }

    /// Keep a field out of the remaining-fields pass
    pub fn skip(&mut self, field: &'static str) {
        self.handled.insert(field);
    }

    pub fn is_handled(&self, field: &str) -> bool {
        self.handled.contains(field)
    }

    /// Emit every unhandled registry field as `<prefix><field>` and return
    /// the flat map
    pub fn finish(mut self, fields: Fields, prefix: &str) -> Attributes {
        for (field, value) in fields {
            if self.handled.contains(field) {
                continue;
            }
            let key = format!("{}{}", prefix, field);
            if self.attributes.contains_key(&key) {
                continue;
            }
            if let Some(value) = normalize(&value) {
                self.attributes.insert(key, value);
            }
        }
        self.attributes
    }
}
