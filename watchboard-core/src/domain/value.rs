//! A number or an explicit "not available" marker.
//!
//! Every numeric field that reaches a `CategoryRecord` goes through
//! `Value::from_f64`, so NaN and infinities never make it into the cache or
//! the persisted JSON. On disk a `Value` is a JSON number or `null`; legacy
//! string placeholders such as `"N/A"` read back as `Unavailable`.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Value {
    Number(f64),
    #[default]
    Unavailable,
}

impl Value {
    /// The single normalization point: non-finite input becomes `Unavailable`.
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            Value::Number(v)
        } else {
            Value::Unavailable
        }
    }

    pub fn from_option(v: Option<f64>) -> Self {
        v.map_or(Value::Unavailable, Value::from_f64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Number(v) => Some(v),
            Value::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Apply `f` to the number, re-normalizing the result.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Value::Number(v) => Value::from_f64(f(v)),
            Value::Unavailable => Value::Unavailable,
        }
    }

    /// Total order used for sorting: `Unavailable` sorts below every number.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Number(_), Value::Unavailable) => Ordering::Greater,
            (Value::Unavailable, Value::Number(_)) => Ordering::Less,
            (Value::Unavailable, Value::Unavailable) => Ordering::Equal,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::from_f64(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        Value::from_option(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v:.2}"),
            Value::Unavailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Number(v) if v.is_finite() => serializer.serialize_f64(v),
            _ => serializer.serialize_none(),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, null, or a placeholder string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from_f64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from_f64(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from_f64(v as f64))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Value, E> {
        Ok(Value::Unavailable)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Value, E> {
        Ok(Value::Unavailable)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Unavailable)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Unavailable)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
        d.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
