//! Values carried by filters, insert rows and update lists
//!
//! Columns in a filter map can hold different SQL types, so values are a
//! closed tagged union rather than an open dynamic type.
//!
//! # Example
//!
//! ```rust
//! use webcommon::crud::{Conditions, FilterValue};
//!
//! let mut eq = Conditions::new();
//! eq.insert("status".to_string(), "active".into());
//! eq.insert("age".to_string(), 42_i64.into());
//! eq.insert("deleted_at".to_string(), FilterValue::Null);
//!
//! assert_eq!(eq["age"], FilterValue::Integer(42));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column name to value mapping used for filter groups
///
/// A `BTreeMap` keeps generated SQL stable: columns inside a group are
/// always rendered in the same order.
pub type Conditions = BTreeMap<String, FilterValue>;

/// Column name to value mapping for one inserted row or an UPDATE SET list
pub type Row = BTreeMap<String, FilterValue>;

/// A value that can be bound into a statement
///
/// Deserializes untagged, so a JSON body such as
/// `{"status": "active", "age": 42, "vip": true, "note": null}` maps straight
/// onto a [`Conditions`] map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FilterValue {
    /// SQL NULL
    #[default]
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Text value
    String(String),
}

impl FilterValue {
    /// Returns `true` for [`FilterValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&String> for FilterValue {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T> From<Option<T>> for FilterValue
where
    T: Into<FilterValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(FilterValue::from("a"), FilterValue::String("a".to_string()));
        assert_eq!(FilterValue::from(7_i32), FilterValue::Integer(7));
        assert_eq!(FilterValue::from(7_u32), FilterValue::Integer(7));
        assert_eq!(FilterValue::from(1.5), FilterValue::Float(1.5));
        assert_eq!(FilterValue::from(true), FilterValue::Boolean(true));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
        assert_eq!(FilterValue::from(Some("x")), FilterValue::from("x"));
    }

    #[test]
    fn test_untagged_json() {
        let eq: Conditions = serde_json::from_str(
            r#"{"status": "active", "age": 42, "score": 1.25, "vip": true, "note": null}"#,
        )
        .unwrap();

        assert_eq!(eq["status"], FilterValue::String("active".to_string()));
        assert_eq!(eq["age"], FilterValue::Integer(42));
        assert_eq!(eq["score"], FilterValue::Float(1.25));
        assert_eq!(eq["vip"], FilterValue::Boolean(true));
        assert!(eq["note"].is_null());
    }

    #[test]
    fn test_serialize_plain_json() {
        let json = serde_json::to_string(&vec![
            FilterValue::Null,
            FilterValue::Integer(3),
            FilterValue::from("x"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,"x"]"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterValue::Null.to_string(), "NULL");
        assert_eq!(FilterValue::from("abc").to_string(), "abc");
        assert_eq!(FilterValue::from(false).to_string(), "false");
    }
}
