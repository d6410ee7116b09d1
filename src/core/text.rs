//! # Text Codec
//!
//! JSON rendition of the value model, built on `serde_json` with
//! `preserve_order` (mapping order survives) and `arbitrary_precision`
//! (number literals are inspected as written, so an integer literal is never
//! silently widened into a float).
//!
//! ## Numeric rules
//! - `Int` is written as bare digits when `|i| <= 2^53` ([`MAX_SAFE_INTEGER`]),
//!   the largest magnitude every IEEE-754 based JSON reader keeps exact.
//!   Anything larger fails with `LossyIntegerEncoding`.
//! - `Float` is written in shortest round-trip form and always carries a
//!   fraction or exponent, so it decodes back as `Float`.
//! - NaN and infinities have no JSON spelling and fail with `NonFiniteFloat`.
//!
//! ## Blobs and timestamps
//! Nested binary and timestamp values use single-key wrappers:
//! ```text
//! {"$binary": "3q2+7w=="}   {"$date": "2024-01-01T12:00:00.5Z"}
//! ```
//! A genuine mapping whose only key collides with a wrapper key is itself
//! wrapped as `{"$mapping": {...}}`. Top-level typed fields use the bare
//! literals from [`binary_literal`] and [`timestamp_literal`] instead; that
//! choice is made by the envelope layer, which knows the schema. A bare blob
//! literal is bounded by `max_binary_len` like any other blob, not by the
//! string limit.
//!
//! Timestamp literals are written as RFC 3339 in UTC. On decode, a literal
//! without an offset is accepted and taken as UTC.

use crate::config::CodecLimits;
use crate::core::value::{check_timestamp_range, Mapping, Value};
use crate::error::{CodecError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number, Value as Json};
use std::io;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Largest integer magnitude written as a bare JSON number (2^53)
pub const MAX_SAFE_INTEGER: i64 = 1 << 53;

pub const BINARY_WRAPPER_KEY: &str = "$binary";
pub const DATE_WRAPPER_KEY: &str = "$date";
pub const MAPPING_WRAPPER_KEY: &str = "$mapping";

const WRAPPER_KEYS: [&str; 3] = [BINARY_WRAPPER_KEY, DATE_WRAPPER_KEY, MAPPING_WRAPPER_KEY];

/// Encoder/decoder for the textual wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec {
    limits: CodecLimits,
}

impl TextCodec {
    pub fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Encode a value tree to JSON bytes
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let json = self.to_json(value, 1)?;
        let bytes = serde_json::to_vec(&json).map_err(io::Error::from)?;
        CodecLimits::guard(bytes.len(), self.limits.max_input_size)?;
        Ok(bytes)
    }

    /// Decode JSON bytes into a value tree
    pub fn decode(&self, input: &[u8]) -> Result<Value> {
        CodecLimits::guard(input.len(), self.limits.max_input_size)?;
        let json: Json = serde_json::from_slice(input).map_err(|e| self.parse_error(input, &e))?;
        self.from_json(json, 1)
    }

    /// Encode an envelope root mapping.
    ///
    /// Entries for which `bare` returns true are written as bare literals
    /// when they hold a blob or timestamp. A bare blob is checked against
    /// `max_binary_len` on its raw size, never against the string limit.
    pub(crate) fn encode_root<F>(&self, root: &Mapping, bare: F) -> Result<Vec<u8>>
    where
        F: Fn(&str) -> bool,
    {
        CodecLimits::guard(root.len(), self.limits.max_collection_len)?;
        let mut object = Map::with_capacity(root.len());
        for (key, item) in root {
            CodecLimits::guard(key.len(), self.limits.max_string_len)?;
            let json = match item {
                Value::Binary(bytes) if bare(key) => {
                    CodecLimits::guard(bytes.len(), self.limits.max_binary_len)?;
                    Json::String(binary_literal(bytes))
                }
                Value::Timestamp(at) if bare(key) => Json::String(timestamp_literal(*at)?),
                _ => self.to_json(item, 2)?,
            };
            object.insert(key.clone(), json);
        }
        let json = if collides_with_wrapper(root) {
            wrapper(MAPPING_WRAPPER_KEY, Json::Object(object))
        } else {
            Json::Object(object)
        };

        let bytes = serde_json::to_vec(&json).map_err(io::Error::from)?;
        CodecLimits::guard(bytes.len(), self.limits.max_input_size)?;
        Ok(bytes)
    }

    /// Decode an envelope root.
    ///
    /// `blob_literals` sees the parsed root object and names the top-level
    /// entries that carry bare base64 blobs. Those strings are measured
    /// against the encoded size of `max_binary_len` instead of
    /// `max_string_len`; the caller decodes them.
    pub(crate) fn decode_root<F>(&self, input: &[u8], blob_literals: F) -> Result<Value>
    where
        F: FnOnce(&Map<String, Json>) -> Vec<String>,
    {
        CodecLimits::guard(input.len(), self.limits.max_input_size)?;
        let json: Json = serde_json::from_slice(input).map_err(|e| self.parse_error(input, &e))?;
        let Json::Object(object) = json else {
            return self.from_json(json, 1);
        };

        let literals = blob_literals(&object);
        if literals.is_empty() {
            return self.from_json(Json::Object(object), 1);
        }

        CodecLimits::guard(object.len(), self.limits.max_collection_len)?;
        let literal_limit = base64_len(self.limits.max_binary_len);
        let mut map = Mapping::with_capacity(object.len());
        for (key, item) in object {
            CodecLimits::guard(key.len(), self.limits.max_string_len)?;
            let value = match item {
                Json::String(literal) if literals.contains(&key) => {
                    CodecLimits::guard(literal.len(), literal_limit)?;
                    Value::Text(literal)
                }
                other => self.from_json(other, 2)?,
            };
            map.insert(key, value);
        }
        Ok(Value::Mapping(map))
    }

    fn to_json(&self, value: &Value, level: usize) -> Result<Json> {
        if level > self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.limits.max_depth,
            });
        }

        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number(safe_integer(*i)?),
            Value::Float(f) => Json::Number(Number::from_f64(*f).ok_or(CodecError::NonFiniteFloat(*f))?),
            Value::Text(s) => {
                CodecLimits::guard(s.len(), self.limits.max_string_len)?;
                Json::String(s.clone())
            }
            Value::Binary(bytes) => {
                CodecLimits::guard(bytes.len(), self.limits.max_binary_len)?;
                wrapper(BINARY_WRAPPER_KEY, Json::String(binary_literal(bytes)))
            }
            Value::Timestamp(at) => wrapper(DATE_WRAPPER_KEY, Json::String(timestamp_literal(*at)?)),
            Value::Sequence(items) => {
                CodecLimits::guard(items.len(), self.limits.max_collection_len)?;
                Json::Array(
                    items
                        .iter()
                        .map(|item| self.to_json(item, level + 1))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            Value::Mapping(map) => {
                CodecLimits::guard(map.len(), self.limits.max_collection_len)?;
                let mut object = Map::with_capacity(map.len());
                for (key, item) in map {
                    CodecLimits::guard(key.len(), self.limits.max_string_len)?;
                    object.insert(key.clone(), self.to_json(item, level + 1)?);
                }
                if collides_with_wrapper(map) {
                    wrapper(MAPPING_WRAPPER_KEY, Json::Object(object))
                } else {
                    Json::Object(object)
                }
            }
        })
    }

    fn from_json(&self, json: Json, level: usize) -> Result<Value> {
        if level > self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.limits.max_depth,
            });
        }

        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => number_to_value(&n)?,
            Json::String(s) => {
                CodecLimits::guard(s.len(), self.limits.max_string_len)?;
                Value::Text(s)
            }
            Json::Array(items) => {
                CodecLimits::guard(items.len(), self.limits.max_collection_len)?;
                Value::Sequence(
                    items
                        .into_iter()
                        .map(|item| self.from_json(item, level + 1))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            Json::Object(object) => {
                CodecLimits::guard(object.len(), self.limits.max_collection_len)?;
                if object.len() == 1 {
                    if let Some(value) = self.unwrap_literal(&object, level)? {
                        return Ok(value);
                    }
                }
                Value::Mapping(self.object_to_mapping(object, level)?)
            }
        })
    }

    /// Recognize the single-key wrapper forms. Returns `None` for an
    /// ordinary one-entry mapping.
    fn unwrap_literal(&self, object: &Map<String, Json>, level: usize) -> Result<Option<Value>> {
        let Some((key, inner)) = object.iter().next() else {
            return Ok(None);
        };

        match (key.as_str(), inner) {
            (BINARY_WRAPPER_KEY, Json::String(literal)) => {
                let bytes = parse_binary_literal(literal)?;
                CodecLimits::guard(bytes.len(), self.limits.max_binary_len)?;
                Ok(Some(Value::Binary(bytes)))
            }
            (DATE_WRAPPER_KEY, Json::String(literal)) => {
                Ok(Some(Value::Timestamp(parse_timestamp_literal(literal)?)))
            }
            (MAPPING_WRAPPER_KEY, Json::Object(inner)) => Ok(Some(Value::Mapping(
                self.object_to_mapping(inner.clone(), level)?,
            ))),
            _ => Ok(None),
        }
    }

    fn object_to_mapping(&self, object: Map<String, Json>, level: usize) -> Result<Mapping> {
        let mut map = Mapping::with_capacity(object.len());
        for (key, item) in object {
            CodecLimits::guard(key.len(), self.limits.max_string_len)?;
            let value = self.from_json(item, level + 1)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn parse_error(&self, input: &[u8], err: &serde_json::Error) -> CodecError {
        let message = err.to_string();
        // serde_json enforces its own nesting ceiling while parsing
        if message.contains("recursion limit exceeded") {
            return CodecError::DepthExceeded {
                limit: self.limits.max_depth,
            };
        }
        CodecError::Parse {
            position: byte_offset(input, err.line(), err.column()),
            message,
        }
    }
}

/// Standard base64 (with padding) of a binary blob
pub fn binary_literal(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Length of the padded base64 literal for `len` raw bytes
pub fn base64_len(len: usize) -> usize {
    len.div_ceil(3).saturating_mul(4)
}

pub fn parse_binary_literal(literal: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(literal)
        .map_err(|e| CodecError::MalformedBinaryLiteral(e.to_string()))
}

/// RFC 3339 in UTC (`Z` suffix) with the full nanosecond fraction when non-zero
pub fn timestamp_literal(at: OffsetDateTime) -> Result<String> {
    check_timestamp_range(at)?;
    at.to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|e| CodecError::MalformedTimestamp(e.to_string()))
}

/// Parse an RFC 3339 timestamp.
///
/// A literal with no offset (`2026-01-08T14:30:00.123456`) is read as UTC.
pub fn parse_timestamp_literal(literal: &str) -> Result<OffsetDateTime> {
    let at = match OffsetDateTime::parse(literal, &Rfc3339) {
        Ok(at) => at.to_offset(UtcOffset::UTC),
        Err(e) => PrimitiveDateTime::parse(
            literal,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
        )
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| CodecError::MalformedTimestamp(format!("{literal:?}: {e}")))?,
    };
    check_timestamp_range(at)?;
    Ok(at)
}

fn safe_integer(value: i64) -> Result<Number> {
    if value.unsigned_abs() > MAX_SAFE_INTEGER.unsigned_abs() {
        Err(CodecError::LossyIntegerEncoding { value })
    } else {
        Ok(Number::from(value))
    }
}

fn number_to_value(number: &Number) -> Result<Value> {
    let literal = number.to_string();
    if literal.contains(['.', 'e', 'E']) {
        let float = number
            .as_f64()
            .ok_or_else(|| CodecError::IntegerOutOfRange(literal.clone()))?;
        if !float.is_finite() {
            return Err(CodecError::NonFiniteFloat(float));
        }
        Ok(Value::Float(float))
    } else {
        literal
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| CodecError::IntegerOutOfRange(literal))
    }
}

fn wrapper(key: &str, inner: Json) -> Json {
    let mut object = Map::with_capacity(1);
    object.insert(key.to_string(), inner);
    Json::Object(object)
}

fn collides_with_wrapper(map: &Mapping) -> bool {
    map.len() == 1 && map.keys().all(|k| WRAPPER_KEYS.contains(&k.as_str()))
}

/// Convert serde_json's 1-based line/column into a byte offset
fn byte_offset(input: &[u8], line: usize, column: usize) -> usize {
    let mut line_start = 0;
    let mut newlines = line.saturating_sub(1);
    if newlines > 0 {
        for (i, byte) in input.iter().enumerate() {
            if *byte == b'\n' {
                newlines -= 1;
                if newlines == 0 {
                    line_start = i + 1;
                    break;
                }
            }
        }
    }
    (line_start + column.saturating_sub(1)).min(input.len())
}
