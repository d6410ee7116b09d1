//! # Error Types
//!
//! Error handling for the packet codec core.
//!
//! Every encode, decode and registry operation returns [`Result`]. Errors are
//! classified precisely enough that a caller can decide whether a failure is a
//! protocol violation (drop the message or connection) or a soft error
//! (request a retransmission). Nothing in this crate terminates the process
//! on bad input.
//!
//! ## Error Categories
//! - **Text input**: `Parse` (with byte position), `MalformedBinaryLiteral`,
//!   `MalformedTimestamp`
//! - **Binary input**: `UnknownTag`, `TruncatedInput`, `TrailingBytes`,
//!   `InvalidUtf8`, `InvalidMapKey`, `UnsupportedExtension`
//! - **Numeric fidelity**: `LossyIntegerEncoding`, `IntegerOutOfRange`,
//!   `NonFiniteFloat`
//! - **Routing and schema**: `UnknownPacketType`, `MissingRequiredField`,
//!   `FieldKindMismatch`, `ConstraintViolation`, `UnknownField`,
//!   `InvalidEnvelope`, `InvalidSchema`
//! - **Resource guards**: `DepthExceeded`, `AllocationLimitExceeded`
//!
//! ## Example Usage
//! ```rust
//! use crosspacket::error::CodecError;
//! use crosspacket::protocol::catalog;
//! use crosspacket::protocol::envelope::EnvelopeCodec;
//! use std::sync::Arc;
//!
//! let codec = EnvelopeCodec::new(Arc::new(catalog::builtin_registry()));
//! match codec.decode_text(br#"{"packetType":"/does/not/exist"}"#) {
//!     Err(CodecError::UnknownPacketType { type_id }) => assert_eq!(type_id, "/does/not/exist"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use crate::core::value::Kind;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Envelope errors
    pub const ERR_ROOT_NOT_MAPPING: &str = "Envelope root is not a mapping";
    pub const ERR_TYPE_NOT_TEXT: &str = "Envelope type identifier is not a string";

    /// Frame errors
    pub const ERR_INVALID_MAGIC: &str = "Invalid frame magic";
    pub const ERR_UNSUPPORTED_VERSION: &str = "Unsupported frame version";

    /// Registry errors
    pub const ERR_GLOBAL_REGISTRY_SET: &str = "Global schema registry already installed";
}

// CodecError is the primary error type for all codec operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unknown tag byte 0x{tag:02x} at byte {position}")]
    UnknownTag { tag: u8, position: usize },

    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("Trailing bytes after root value at byte {position}")]
    TrailingBytes { position: usize },

    #[error("Invalid UTF-8 in string at byte {position}")]
    InvalidUtf8 { position: usize },

    #[error("Map key at byte {position} is not a string")]
    InvalidMapKey { position: usize },

    #[error("Unsupported extension type {ext_type}")]
    UnsupportedExtension { ext_type: i8 },

    #[error("Integer {value} is outside the exact textual range")]
    LossyIntegerEncoding { value: i64 },

    #[error("Integer out of 64-bit signed range: {0}")]
    IntegerOutOfRange(String),

    #[error("Non-finite float {0} cannot be encoded as text")]
    NonFiniteFloat(f64),

    #[error("Malformed binary literal: {0}")]
    MalformedBinaryLiteral(String),

    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Unknown packet type: {type_id}")]
    UnknownPacketType { type_id: String },

    #[error("Missing required field: {name}")]
    MissingRequiredField { name: String },

    #[error("Field {name}: expected {expected}, found {actual}")]
    FieldKindMismatch {
        name: String,
        expected: Kind,
        actual: Kind,
    },

    #[error("Field {name} violates its constraints: {reason}")]
    ConstraintViolation { name: String, reason: String },

    #[error("Field {name} is not declared by the schema")]
    UnknownField { name: String },

    #[error("Nesting depth exceeds limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("Allocation of {requested} exceeds limit of {limit}")]
    AllocationLimitExceeded { requested: usize, limit: usize },

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Unknown wire format byte: 0x{0:02x}")]
    UnknownFormat(u8),

    #[error("No handler registered for packet type {type_id}")]
    NoHandler { type_id: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl CodecError {
    /// True when the failure came from malformed or hostile input bytes,
    /// as opposed to a well-formed envelope that violates its schema.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            CodecError::Parse { .. }
                | CodecError::UnknownTag { .. }
                | CodecError::TruncatedInput { .. }
                | CodecError::TrailingBytes { .. }
                | CodecError::InvalidUtf8 { .. }
                | CodecError::InvalidMapKey { .. }
                | CodecError::UnsupportedExtension { .. }
                | CodecError::MalformedBinaryLiteral(_)
                | CodecError::MalformedTimestamp(_)
                | CodecError::DepthExceeded { .. }
                | CodecError::AllocationLimitExceeded { .. }
        )
    }
}

/// Type alias for Results using CodecError
pub type Result<T> = std::result::Result<T, CodecError>;
