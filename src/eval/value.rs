//! Scalar values flowing through condition and formula evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A value resolved from a context field or supplied in a policy condition.
///
/// Serialized untagged, so policy JSON can use plain literals:
/// `5`, `true`, `"Sales"`, or `[1, 3]` for `BETWEEN`/`IN` operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A boolean flag.
    Bool(bool),
    /// A numeric value (integers and decimals alike).
    Number(f64),
    /// A text value.
    Text(String),
    /// A list of values, used by `BETWEEN` and `IN`.
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// The value as a number, if it is numeric or numeric-looking text.
    /// Booleans coerce to 0/1, matching comparison semantics.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::List(_) => None,
        }
    }

    /// True when this value is the number zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, FieldValue::Number(n) if *n == 0.0)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Converts a JSON value from a context snapshot into a [`FieldValue`].
/// Objects do not convert; a dotted path must land on a leaf or array.
pub fn from_json(value: &serde_json::Value) -> Option<FieldValue> {
    match value {
        serde_json::Value::Bool(b) => Some(FieldValue::Bool(*b)),
        serde_json::Value::Number(n) => n.as_f64().map(FieldValue::Number),
        serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
        serde_json::Value::Array(items) => {
            let converted: Option<Vec<FieldValue>> = items.iter().map(from_json).collect();
            converted.map(FieldValue::List)
        }
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_deserialization() {
        assert_eq!(
            serde_json::from_str::<FieldValue>("5").unwrap(),
            FieldValue::Number(5.0)
        );
        assert_eq!(
            serde_json::from_str::<FieldValue>("true").unwrap(),
            FieldValue::Bool(true)
        );
        assert_eq!(
            serde_json::from_str::<FieldValue>("\"Sales\"").unwrap(),
            FieldValue::Text("Sales".to_string())
        );
        assert_eq!(
            serde_json::from_str::<FieldValue>("[1, 3]").unwrap(),
            FieldValue::List(vec![FieldValue::Number(1.0), FieldValue::Number(3.0)])
        );
    }

    #[test]
    fn test_as_number_coercions() {
        assert_eq!(FieldValue::Number(4.5).as_number(), Some(4.5));
        assert_eq!(FieldValue::Bool(true).as_number(), Some(1.0));
        assert_eq!(FieldValue::Text(" 12 ".to_string()).as_number(), Some(12.0));
        assert_eq!(FieldValue::Text("abc".to_string()).as_number(), None);
        assert_eq!(FieldValue::List(vec![]).as_number(), None);
    }

    #[test]
    fn test_from_json_skips_objects_and_null() {
        assert_eq!(from_json(&serde_json::json!(null)), None);
        assert_eq!(from_json(&serde_json::json!({"a": 1})), None);
        assert_eq!(
            from_json(&serde_json::json!(3)),
            Some(FieldValue::Number(3.0))
        );
    }

    #[test]
    fn test_is_zero() {
        assert!(FieldValue::Number(0.0).is_zero());
        assert!(!FieldValue::Number(0.5).is_zero());
        assert!(!FieldValue::Bool(false).is_zero());
    }
}
