//! Output normalization
//!
//! Inference capabilities hand back loosely typed trees whose leaves are
//! library-native scalars (`f32` probabilities, `u64` offsets, ...). Everything
//! that crosses the HTTP boundary goes through [`normalize`], which walks the
//! tree and produces a plain [`serde_json::Value`].
//!
//! Normalization is total: non-finite floats have no JSON representation and
//! become `null`, every other leaf maps to a number, string, boolean or null.
//! It is also idempotent: a normalized tree lifted back with
//! `RawValue::from(value)` normalizes to itself.

use serde_json::{Map, Number, Value};

/// Raw output tree produced by an inference capability
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Seq(Vec<RawValue>),
    /// String-keyed mapping; entry order is kept
    Map(Vec<(String, RawValue)>),
}

impl RawValue {
    /// Build a mapping from key/value pairs
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RawValue)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a key in a mapping
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Interpret a scalar as a non-negative integer offset
    pub fn as_offset(&self) -> Option<usize> {
        match *self {
            Self::UInt(v) => usize::try_from(v).ok(),
            Self::Int(v) => usize::try_from(v).ok(),
            Self::F32(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as usize),
            Self::F64(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as usize),
            _ => None,
        }
    }

    /// Interpret a scalar as a float
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(f64::from(v)),
            Self::F64(v) => Some(v),
            Self::Int(v) => Some(v as f64),
            Self::UInt(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Convert a raw output tree into a JSON-safe value
pub fn normalize(raw: RawValue) -> Value {
    match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(b),
        RawValue::Int(i) => Value::Number(i.into()),
        RawValue::UInt(u) => Value::Number(u.into()),
        RawValue::F32(f) => float(f64::from(f)),
        RawValue::F64(f) => float(f),
        RawValue::Str(s) => Value::String(s),
        RawValue::Seq(items) => Value::Array(items.into_iter().map(normalize).collect()),
        RawValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key, normalize(value));
            }
            Value::Object(map)
        }
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    n.as_f64().map(Self::F64).unwrap_or(Self::Null)
                }
            }
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<f32> for RawValue {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<usize> for RawValue {
    fn from(v: usize) -> Self {
        Self::UInt(v as u64)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(v: Vec<T>) -> Self {
        Self::Seq(v.into_iter().map(Into::into).collect())
    }
}
