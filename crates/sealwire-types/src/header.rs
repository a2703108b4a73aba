//! Envelope header values and the immutable header map.
//!
//! Headers are keyed by case-sensitive strings. A [`Headers`] map is never
//! mutated in place: every change produces a new map, and clones share the
//! same underlying storage, so a built envelope's headers can be read from
//! any number of tasks without locking.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A typed header value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HeaderValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl HeaderValue {
    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Timestamp(_) => "timestamp",
            Self::Uuid(_) => "uuid",
            Self::Json(_) => "json",
        }
    }

    /// `false` for values JSON cannot carry (NaN and infinite floats).
    #[must_use]
    pub fn is_encodable(&self) -> bool {
        match self {
            Self::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for HeaderValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for HeaderValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<DateTime<Utc>> for HeaderValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Uuid> for HeaderValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<serde_json::Value> for HeaderValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

/// Typed extraction from a [`HeaderValue`].
///
/// Conversions are strict: a value of a different variant yields `None`
/// rather than being coerced.
pub trait FromHeaderValue: Sized {
    fn from_header_value(value: &HeaderValue) -> Option<Self>;
}

impl FromHeaderValue for String {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromHeaderValue for i64 {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromHeaderValue for f64 {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromHeaderValue for bool {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromHeaderValue for DateTime<Utc> {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromHeaderValue for Uuid {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Uuid(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromHeaderValue for serde_json::Value {
    fn from_header_value(value: &HeaderValue) -> Option<Self> {
        match value {
            HeaderValue::Json(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Immutable, key-ordered header map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers(Arc<BTreeMap<String, HeaderValue>>);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(map: BTreeMap<String, HeaderValue>) -> Self {
        Self(Arc::new(map))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    /// Typed lookup. Absent keys and variant mismatches both yield `None`.
    #[must_use]
    pub fn try_get<V: FromHeaderValue>(&self, key: &str) -> Option<V> {
        self.0.get(key).and_then(V::from_header_value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HeaderValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// A new map with `key` set to `value`. `self` is unchanged.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        let mut next = (*self.0).clone();
        next.insert(key.into(), value.into());
        Self(Arc::new(next))
    }

    /// A new map without `key`. `self` is unchanged.
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        if !self.0.contains_key(key) {
            return self.clone();
        }
        let mut next = (*self.0).clone();
        next.remove(key);
        Self(Arc::new(next))
    }

    /// Copy out a mutable map, e.g. to seed a builder.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, HeaderValue> {
        (*self.0).clone()
    }

    /// Plain map for wire formats that do not care about ordering.
    #[must_use]
    pub fn to_hash_map(&self) -> HashMap<String, HeaderValue> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl FromIterator<(String, HeaderValue)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, HeaderValue)>>(iter: I) -> Self {
        Self(Arc::new(iter.into_iter().collect()))
    }
}

impl From<HashMap<String, HeaderValue>> for Headers {
    fn from(map: HashMap<String, HeaderValue>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_get_matching_type() {
        let headers = Headers::new().with("CorrelationId", "abc").with("Retries", 3_i64);
        assert_eq!(headers.try_get::<String>("CorrelationId").as_deref(), Some("abc"));
        assert_eq!(headers.try_get::<i64>("Retries"), Some(3));
    }

    #[test]
    fn try_get_type_mismatch_is_not_found() {
        let headers = Headers::new().with("Retries", 3_i64);
        assert_eq!(headers.try_get::<String>("Retries"), None);
        assert_eq!(headers.try_get::<bool>("Retries"), None);
    }

    #[test]
    fn non_finite_floats_are_not_encodable() {
        assert!(HeaderValue::from(0.25).is_encodable());
        assert!(!HeaderValue::from(f64::NAN).is_encodable());
        assert!(!HeaderValue::from(f64::INFINITY).is_encodable());
        assert!(!HeaderValue::from(f64::NEG_INFINITY).is_encodable());
        assert!(HeaderValue::from("NaN").is_encodable());
    }

    #[test]
    fn try_get_absent_key() {
        assert_eq!(Headers::new().try_get::<String>("missing"), None);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let headers = Headers::new().with("Key", "upper").with("key", "lower");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.try_get::<String>("Key").as_deref(), Some("upper"));
        assert_eq!(headers.try_get::<String>("key").as_deref(), Some("lower"));
    }

    #[test]
    fn with_does_not_touch_original() {
        let original = Headers::new().with("A", 1_i64);
        let changed = original.with("B", 2_i64);
        assert_eq!(original.len(), 1);
        assert_eq!(changed.len(), 2);
        assert!(!original.contains_key("B"));
    }

    #[test]
    fn without_removes_only_in_copy() {
        let original = Headers::new().with("A", 1_i64).with("B", 2_i64);
        let trimmed = original.without("A");
        assert!(original.contains_key("A"));
        assert!(!trimmed.contains_key("A"));
        assert_eq!(trimmed.len(), 1);
    }

    #[test]
    fn iteration_is_key_ordered() {
        let headers = Headers::new().with("b", 2_i64).with("a", 1_i64).with("c", 3_i64);
        let keys: Vec<_> = headers.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn header_value_serde_roundtrip() {
        let values = vec![
            HeaderValue::from("text"),
            HeaderValue::from(42_i64),
            HeaderValue::from(true),
            HeaderValue::from(Uuid::now_v7()),
            HeaderValue::from(serde_json::json!({"nested": [1, 2]})),
        ];
        for value in values {
            let json = serde_json::to_string(&value).unwrap();
            let back: HeaderValue = serde_json::from_str(&json).unwrap();
            assert_eq!(value, back);
        }
    }
}
