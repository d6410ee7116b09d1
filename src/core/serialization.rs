//! # Wire Formats
//!
//! The two interchangeable encodings of a packet envelope.
//!
//! Both formats carry the same value model, so any envelope can be moved
//! from one to the other without loss (subject to the text format's
//! integer range).
//!
//! ## Formats
//! - **Text**: JSON-compatible, human-readable, diffable
//! - **Binary**: MessagePack-compatible, compact, exact for every `Int`
//!
//! ## Format byte
//! Framed payloads carry a one-byte format identifier so a reader can pick
//! the decoder without inspecting the payload.

use crate::config::CodecLimits;
use crate::core::binary::BinaryCodec;
use crate::core::text::TextCodec;
use crate::core::value::Value;
use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// JSON-compatible text
    Text,
    /// MessagePack-compatible binary (default, compact)
    #[default]
    Binary,
}

impl WireFormat {
    /// Get the format identifier byte for framed payloads
    pub fn format_byte(self) -> u8 {
        match self {
            WireFormat::Text => 0x02,
            WireFormat::Binary => 0x03,
        }
    }

    /// Detect format from identifier byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(WireFormat::Text),
            0x03 => Some(WireFormat::Binary),
            _ => None,
        }
    }

    /// Like [`from_byte`](Self::from_byte) but fails with `UnknownFormat`
    pub fn try_from_byte(byte: u8) -> Result<Self> {
        Self::from_byte(byte).ok_or(CodecError::UnknownFormat(byte))
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            WireFormat::Text => "JSON",
            WireFormat::Binary => "MessagePack",
        }
    }

    /// Encode a bare value tree in this format, without envelope handling
    pub fn encode_value(self, value: &Value, limits: CodecLimits) -> Result<Vec<u8>> {
        match self {
            WireFormat::Text => TextCodec::new(limits).encode(value),
            WireFormat::Binary => BinaryCodec::new(limits).encode(value),
        }
    }

    /// Decode a bare value tree in this format, without envelope handling
    pub fn decode_value(self, input: &[u8], limits: CodecLimits) -> Result<Value> {
        match self {
            WireFormat::Text => TextCodec::new(limits).decode(input),
            WireFormat::Binary => BinaryCodec::new(limits).decode(input),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
