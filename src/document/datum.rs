//! Datum - the JSON-like value type stored in document payloads.
//!
//! A `Datum` represents any value an agent can put into a document.
//! It mirrors JSON, keeping integers and floats apart so that ids and
//! counters survive a round trip unchanged.
//!
//! # Supported Types
//!
//! - **Null**: Absence of a value
//! - **Boolean**: true or false
//! - **Integer**: i64 whole numbers
//! - **Unsigned**: u64 whole numbers above `i64::MAX`
//! - **Number**: f64 floating point numbers
//! - **String**: UTF-8 encoded text
//! - **Array**: Ordered list of datums
//! - **Object**: Key-value map (like JSON object)
//!
//! # Example
//!
//! ```rust
//! use docstore::document::{Datum, Payload};
//!
//! let mut obj = Payload::new();
//! obj.insert("metric".to_string(), Datum::from("lammps_performance"));
//! obj.insert("value".to_string(), Datum::from(42));
//! let doc = Datum::Object(obj);
//!
//! assert_eq!(doc.get("value").map(Datum::canonical_text), Some("42".to_string()));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Payload of a document: string keys mapped to datums.
pub type Payload = BTreeMap<String, Datum>;

/// Largest integer an f64 represents exactly (2^53).
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Datum represents a value inside a document payload.
///
/// Serializes to and from plain JSON with serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
    Null,
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Number(f64),
    String(String),
    Array(Vec<Datum>),
    Object(Payload),
}

impl Datum {
    /// Check if datum is null
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Datum::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as number, widening integers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Datum::Integer(n) => Some(*n as f64),
            Datum::Unsigned(n) => Some(*n as f64),
            Datum::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as array
    pub fn as_array(&self) -> Option<&Vec<Datum>> {
        match self {
            Datum::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get as object
    pub fn as_object(&self) -> Option<&Payload> {
        match self {
            Datum::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Look up a top-level field of an object datum.
    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Canonical string rendering used for textual equality.
    ///
    /// Strings render raw (no quotes), so the number `5`, the float `5.0`
    /// and the string `"5"` all render as `5`. Arrays and objects render
    /// as compact JSON.
    pub fn canonical_text(&self) -> String {
        match self {
            Datum::Null => "null".to_string(),
            Datum::Boolean(b) => b.to_string(),
            Datum::Integer(n) => n.to_string(),
            Datum::Unsigned(n) => n.to_string(),
            Datum::Number(n) => canonical_float(*n),
            Datum::String(s) => s.clone(),
            Datum::Array(_) | Datum::Object(_) => self.to_string(),
        }
    }

    /// Interpret this datum as a record id.
    ///
    /// Accepts positive integers, integral positive floats and strings
    /// holding a positive integer. Everything else is not an id.
    pub fn as_record_id(&self) -> Option<u64> {
        match self {
            Datum::Integer(n) if *n > 0 => Some(*n as u64),
            Datum::Unsigned(n) if *n > 0 => Some(*n),
            Datum::Number(n)
                if n.is_finite() && n.fract() == 0.0 && *n >= 1.0 && *n <= MAX_EXACT_FLOAT_INT =>
            {
                Some(*n as u64)
            }
            Datum::String(s) => s.trim().parse::<u64>().ok().filter(|id| *id > 0),
            _ => None,
        }
    }

    /// Returns the path of the first non-finite number, if any.
    ///
    /// NaN and infinities have no JSON representation.
    pub fn find_non_finite(&self) -> Option<String> {
        match self {
            Datum::Number(n) if !n.is_finite() => Some(String::new()),
            Datum::Array(arr) => arr.iter().enumerate().find_map(|(i, item)| {
                item.find_non_finite().map(|rest| join_path(&i.to_string(), &rest))
            }),
            Datum::Object(obj) => obj
                .iter()
                .find_map(|(key, value)| value.find_non_finite().map(|rest| join_path(key, &rest))),
            _ => None,
        }
    }
}

fn canonical_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_FLOAT_INT {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn join_path(head: &str, rest: &str) -> String {
    if rest.is_empty() {
        head.to_string()
    } else {
        format!("{}.{}", head, rest)
    }
}

// Conversions
impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Boolean(b)
    }
}

impl From<i32> for Datum {
    fn from(n: i32) -> Self {
        Datum::Integer(n as i64)
    }
}

impl From<i64> for Datum {
    fn from(n: i64) -> Self {
        Datum::Integer(n)
    }
}

impl From<u64> for Datum {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Datum::Integer(n),
            Err(_) => Datum::Unsigned(n),
        }
    }
}

impl From<f64> for Datum {
    fn from(n: f64) -> Self {
        Datum::Number(n)
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::String(s)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::String(s.to_string())
    }
}

impl From<Payload> for Datum {
    fn from(obj: Payload) -> Self {
        Datum::Object(obj)
    }
}

impl From<serde_json::Value> for Datum {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Datum::Null,
            serde_json::Value::Bool(b) => Datum::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Datum::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    Datum::Unsigned(u)
                } else {
                    Datum::Number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Datum::String(s),
            serde_json::Value::Array(arr) => {
                Datum::Array(arr.into_iter().map(Datum::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Datum::Object(obj.into_iter().map(|(k, v)| (k, Datum::from(v))).collect())
            }
        }
    }
}

impl From<Datum> for serde_json::Value {
    fn from(datum: Datum) -> Self {
        match datum {
            Datum::Null => serde_json::Value::Null,
            Datum::Boolean(b) => serde_json::Value::Bool(b),
            Datum::Integer(n) => serde_json::Value::Number(n.into()),
            Datum::Unsigned(n) => serde_json::Value::Number(n.into()),
            Datum::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Datum::String(s) => serde_json::Value::String(s),
            Datum::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Datum::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_text_is_textual() {
        assert_eq!(Datum::from(5).canonical_text(), "5");
        assert_eq!(Datum::from(5.0).canonical_text(), "5");
        assert_eq!(Datum::from("5").canonical_text(), "5");
        assert_eq!(Datum::from(2.5).canonical_text(), "2.5");
        assert_eq!(Datum::from(true).canonical_text(), "true");
        assert_eq!(Datum::Null.canonical_text(), "null");
        assert_eq!(Datum::from(json!([1, "a"])).canonical_text(), r#"[1,"a"]"#);
    }

    #[test]
    fn test_json_integers_stay_integers() {
        let datum = Datum::from(json!({"id": 7, "ratio": 0.5}));
        assert_eq!(datum.get("id"), Some(&Datum::Integer(7)));
        assert_eq!(datum.get("ratio"), Some(&Datum::Number(0.5)));

        let parsed: Datum = serde_json::from_str(r#"{"n": 12, "f": 1.5, "s": null}"#).unwrap();
        assert_eq!(parsed.get("n"), Some(&Datum::Integer(12)));
        assert_eq!(parsed.get("f"), Some(&Datum::Number(1.5)));
        assert_eq!(parsed.get("s"), Some(&Datum::Null));
    }

    #[test]
    fn test_large_unsigned_integers_are_exact() {
        let big = u64::MAX;
        let datum = Datum::from(json!({"digest": big}));
        assert_eq!(datum.get("digest"), Some(&Datum::Unsigned(big)));
        assert_eq!(serde_json::Value::from(datum), json!({"digest": big}));

        let parsed: Datum = serde_json::from_str(r#"{"digest": 18446744073709551615}"#).unwrap();
        assert_eq!(parsed.get("digest"), Some(&Datum::Unsigned(big)));
        assert_eq!(parsed.to_string(), r#"{"digest":18446744073709551615}"#);

        assert_eq!(Datum::from(big).canonical_text(), "18446744073709551615");
        assert_eq!(Datum::from(big).as_record_id(), Some(big));
        assert_eq!(Datum::from(7u64), Datum::Integer(7));
    }

    #[test]
    fn test_record_id_interpretation() {
        assert_eq!(Datum::from(3).as_record_id(), Some(3));
        assert_eq!(Datum::from(3.0).as_record_id(), Some(3));
        assert_eq!(Datum::from("12").as_record_id(), Some(12));

        assert_eq!(Datum::from(0).as_record_id(), None);
        assert_eq!(Datum::from(-4).as_record_id(), None);
        assert_eq!(Datum::from(1.5).as_record_id(), None);
        assert_eq!(Datum::from("abc").as_record_id(), None);
        assert_eq!(Datum::from(true).as_record_id(), None);
        assert_eq!(Datum::Null.as_record_id(), None);
    }

    #[test]
    fn test_find_non_finite() {
        let mut inner = Payload::new();
        inner.insert("score".to_string(), Datum::Number(f64::NAN));
        let mut outer = Payload::new();
        outer.insert("ok".to_string(), Datum::from(1));
        outer.insert("runs".to_string(), Datum::Array(vec![Datum::Object(inner)]));

        assert_eq!(
            Datum::Object(outer).find_non_finite(),
            Some("runs.0.score".to_string())
        );
        assert_eq!(Datum::from(json!({"a": [1.0, 2]})).find_non_finite(), None);
    }
}
