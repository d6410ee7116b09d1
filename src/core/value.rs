//! # Value Model
//!
//! The closed set of data a packet field can hold. Both codecs translate to
//! and from this model and nothing else, which is what keeps the text and
//! binary encodings interchangeable.
//!
//! ## Equality
//! Equality is exact. An `Int` never equals a `Float` (`5` is not `5.0`),
//! floats compare by bit pattern, timestamps compare as instants and
//! mappings compare without regard to key order.
//!
//! ## Timestamps
//! Timestamps are UTC instants with nanosecond precision, limited to the
//! years 0000 through 9999. That is the range RFC 3339 can spell, and the
//! binary codec enforces the same range so that no instance encodes in one
//! format but not the other.
//!
//! ## Optional fields
//! There is no `Optional` variant: a field slot is an `Option<Value>`.
//! `None` is *Absent* (the key is omitted from the wire), while
//! `Some(Value::Null)` is an explicit null marker.

use crate::error::{CodecError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{OffsetDateTime, UtcOffset};

/// Ordered string-keyed mapping. Insertion order is kept for the wire,
/// equality ignores it.
pub type Mapping = IndexMap<String, Value>;

/// Default ceiling on nesting depth for both codecs.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Calendar years a timestamp may fall in
pub const TIMESTAMP_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Fail with `MalformedTimestamp` when `at` lies outside [`TIMESTAMP_YEARS`].
pub fn check_timestamp_range(at: OffsetDateTime) -> Result<()> {
    let year = at.to_offset(UtcOffset::UTC).year();
    if TIMESTAMP_YEARS.contains(&year) {
        Ok(())
    } else {
        Err(CodecError::MalformedTimestamp(format!(
            "year {year} is outside 0000-9999"
        )))
    }
}

/// Kind tag of a [`Value`], plus `Dynamic` for schema fields that accept any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Binary,
    Timestamp,
    Sequence,
    Mapping,
    Dynamic,
}

impl Kind {
    /// Lower-case name used in schema IR and error messages
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Text => "text",
            Kind::Binary => "binary",
            Kind::Timestamp => "timestamp",
            Kind::Sequence => "sequence",
            Kind::Mapping => "mapping",
            Kind::Dynamic => "dynamic",
        }
    }

    /// Whether a value of kind `actual` satisfies a field declared as `self`.
    #[inline]
    pub fn accepts(self, actual: Kind) -> bool {
        self == Kind::Dynamic || self == actual
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single datum in the value model.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Binary(Vec<u8>),
    /// Always held in UTC
    Timestamp(OffsetDateTime),
    Sequence(Vec<Value>),
    Mapping(Mapping),
}

impl Value {
    /// Build a binary blob. `Vec<u8>` has no `From` impl because it would be
    /// ambiguous with a sequence of small integers.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(bytes.into())
    }

    /// Build a timestamp, normalizing the offset to UTC.
    pub fn timestamp(at: OffsetDateTime) -> Self {
        Value::Timestamp(at.to_offset(UtcOffset::UTC))
    }

    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Kind of this value. Never returns [`Kind::Dynamic`].
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Text(_) => Kind::Text,
            Value::Binary(_) => Kind::Binary,
            Value::Timestamp(_) => Kind::Timestamp,
            Value::Sequence(_) => Kind::Sequence,
            Value::Mapping(_) => Kind::Mapping,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Nesting depth of this tree. Scalars and empty containers are 1.
    pub fn depth(&self) -> usize {
        match self {
            Value::Sequence(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Mapping(map) => 1 + map.values().map(Value::depth).max().unwrap_or(0),
            _ => 1,
        }
    }

    /// Fail with `DepthExceeded` if this tree nests deeper than `limit`.
    ///
    /// A scalar has depth 1. The walk stops as soon as the limit is crossed,
    /// so the recursion itself is bounded by `limit`.
    pub fn check_depth(&self, limit: usize) -> Result<()> {
        fn walk(value: &Value, level: usize, limit: usize) -> Result<()> {
            if level > limit {
                return Err(CodecError::DepthExceeded { limit });
            }
            match value {
                Value::Sequence(items) => items.iter().try_for_each(|v| walk(v, level + 1, limit)),
                Value::Mapping(map) => map.values().try_for_each(|v| walk(v, level + 1, limit)),
                _ => Ok(()),
            }
        }
        walk(self, 1, limit)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Self {
        Value::timestamp(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Sequence(v)
    }
}

impl From<Mapping> for Value {
    fn from(v: Mapping) -> Self {
        Value::Mapping(v)
    }
}
