//! Attribute and field value types
//!
//! `AttributeValue` is the open value type stored in an element's
//! `attributes` bag: a scalar or a list of scalars. `FieldValue` is the
//! richer value produced by each entity's field registry and consumed by the
//! attribute flattener.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A primitive attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

/// Value of an entry in an element's open `attributes` map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl AttributeValue {
    /// Build a list value from any iterable of scalar-convertible items
    pub fn list<T: Into<Scalar>>(items: impl IntoIterator<Item = T>) -> Self {
        AttributeValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Scalar> for AttributeValue {
    fn from(v: Scalar) -> Self {
        AttributeValue::Scalar(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Scalar(v.into())
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Scalar(v.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Scalar(v.into())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Scalar(v.into())
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Scalar(v.into())
    }
}

impl From<Vec<Scalar>> for AttributeValue {
    fn from(v: Vec<Scalar>) -> Self {
        AttributeValue::List(v)
    }
}

/// A field value as exposed by an entity's field registry
///
/// This is the explicit stand-in for a model dump: every entity lists its
/// fields as `(name, FieldValue)` pairs and the flattener dispatches on the
/// variant.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Label of an enumerated value
    Label(String),
    Timestamp(DateTime<Utc>),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    /// Serde dump of a composite value
    Dump(serde_json::Value),
    /// Composite value that could not be dumped, already rendered
    Rendered(String),
}

impl FieldValue {
    /// Enumerated value rendered through its label
    pub fn label(value: impl fmt::Display) -> Self {
        FieldValue::Label(value.to_string())
    }

    /// Optional enumerated value
    pub fn opt_label<T: fmt::Display>(value: Option<T>) -> Self {
        value.map(Self::label).unwrap_or(FieldValue::Null)
    }

    /// Dump a composite value through serde, or render it with `Debug`
    /// when it cannot be serialized
    pub fn dump<T: Serialize + fmt::Debug>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => FieldValue::Dump(json),
            Err(_) => FieldValue::Rendered(format!("{:?}", value)),
        }
    }

    /// List of composite values, each dumped through serde
    pub fn dump_list<T: Serialize + fmt::Debug>(values: &[T]) -> Self {
        FieldValue::List(values.iter().map(Self::dump).collect())
    }

    /// Check whether this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Check whether this value is a primitive scalar
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            FieldValue::Bool(_) | FieldValue::Int(_) | FieldValue::Float(_) | FieldValue::Str(_)
        )
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v as i64)
    }
}

/// Values beyond `i64::MAX` are kept as their decimal string
impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => FieldValue::Int(i),
            Err(_) => FieldValue::Str(v.to_string()),
        }
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::from(v as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Str(v.clone())
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<&Scalar> for FieldValue {
    fn from(v: &Scalar) -> Self {
        match v {
            Scalar::Bool(b) => FieldValue::Bool(*b),
            Scalar::Int(i) => FieldValue::Int(*i),
            Scalar::Float(x) => FieldValue::Float(*x),
            Scalar::String(s) => FieldValue::Str(s.clone()),
        }
    }
}

impl From<&AttributeValue> for FieldValue {
    fn from(v: &AttributeValue) -> Self {
        match v {
            AttributeValue::Scalar(s) => s.into(),
            AttributeValue::List(items) => FieldValue::List(items.iter().map(Into::into).collect()),
        }
    }
}

impl From<&serde_json::Value> for FieldValue {
    fn from(v: &serde_json::Value) -> Self {
        use serde_json::Value;

        match v {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::Str(s.clone()),
            Value::Array(items) => FieldValue::List(items.iter().map(Into::into).collect()),
            Value::Object(map) => FieldValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T> From<&Vec<T>> for FieldValue
where
    T: Clone + Into<FieldValue>,
{
    fn from(v: &Vec<T>) -> Self {
        FieldValue::List(v.iter().cloned().map(Into::into).collect())
    }
}

/// Ordered field registry of an entity
pub type Fields = Vec<(&'static str, FieldValue)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_deserialization_prefers_int() {
        let v: Scalar = serde_json::from_str("3").unwrap();
        assert_eq!(v, Scalar::Int(3));

        let v: Scalar = serde_json::from_str("3.5").unwrap();
        assert_eq!(v, Scalar::Float(3.5));

        let v: Scalar = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(v, Scalar::String("x".to_string()));
    }

    #[test]
    fn test_attribute_value_list() {
        let v: AttributeValue = serde_json::from_str(r#"["a", 1, true]"#).unwrap();
        assert_eq!(
            v,
            AttributeValue::List(vec![
                Scalar::String("a".to_string()),
                Scalar::Int(1),
                Scalar::Bool(true)
            ])
        );
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<String> = None;
        assert!(FieldValue::from(none).is_null());
        assert_eq!(
            FieldValue::from(Some("x".to_string())),
            FieldValue::Str("x".to_string())
        );
    }

    #[test]
    fn test_json_value_conversion() {
        let json = serde_json::json!({"q": "2+2", "n": 3, "ok": true});
        match FieldValue::from(&json) {
            FieldValue::Map(map) => {
                assert_eq!(map["q"], FieldValue::Str("2+2".to_string()));
                assert_eq!(map["n"], FieldValue::Int(3));
                assert_eq!(map["ok"], FieldValue::Bool(true));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_dump_falls_back_to_rendering() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "tuple keys are not JSON object keys");
        match FieldValue::dump(&bad) {
            FieldValue::Rendered(text) => assert!(text.contains("tuple keys")),
            other => panic!("expected rendered value, got {:?}", other),
        }
    }
}
