//! # crosspacket
//!
//! Typed packet envelopes with two interchangeable wire formats: a
//! JSON-compatible text format and a MessagePack-compatible binary format.
//!
//! Every packet names its schema on the wire (`packetType`), so a receiver
//! that has never seen the sender's source can resolve the schema and
//! project the fields back into a typed [`PacketInstance`].
//!
//! ## Guarantees
//! - **Lossless round-trips** in both formats: integers stay integers,
//!   floats stay floats, blobs are byte-identical, timestamps keep
//!   nanoseconds
//! - **Cross-format stability**: the same instance decodes to equal values
//!   from either format, except that the text format refuses integers
//!   outside ±2^53 with `LossyIntegerEncoding`
//! - **Total decode**: an error never comes with a partially built packet
//! - **Hostile input**: length fields are checked before allocation and
//!   nesting depth is bounded
//!
//! ## Architecture
//! - [`core`]: value model, text and binary codecs, framing
//! - [`protocol`]: schemas, registry, packet instances, envelope codec,
//!   handler routing
//! - [`config`]: resource limits and schema sources
//! - [`error`]: the [`CodecError`] taxonomy
//! - [`utils`]: metrics
//!
//! ## Example
//! ```rust
//! use crosspacket::protocol::catalog;
//! use crosspacket::{EnvelopeCodec, PacketInstance, Value};
//! use std::sync::Arc;
//!
//! let codec = EnvelopeCodec::new(Arc::new(catalog::builtin_registry()));
//! let schema = codec.resolve(catalog::MESSAGE)?;
//! let packet = PacketInstance::builder(schema)
//!     .set("sender_id", "alice")?
//!     .set("content", "hello")?
//!     .set("timestamp", time::OffsetDateTime::UNIX_EPOCH)?
//!     .build();
//!
//! let bytes = codec.encode_binary(&packet)?;
//! let decoded = codec.decode_binary(&bytes)?;
//! assert_eq!(decoded.get("content"), Some(&Value::from("hello")));
//! # Ok::<(), crosspacket::CodecError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::config::{CodecConfig, CodecLimits};
pub use crate::core::frame::{Frame, FrameCodec};
pub use crate::core::serialization::WireFormat;
pub use crate::core::value::{Kind, Mapping, Value};
pub use crate::error::{CodecError, Result};
pub use crate::protocol::dispatcher::Dispatcher;
pub use crate::protocol::envelope::{
    decode_binary, decode_text, encode_binary, encode_text, register_schema, resolve_schema,
    EnvelopeCodec,
};
pub use crate::protocol::packet::{PacketBuilder, PacketInstance};
pub use crate::protocol::registry::SchemaRegistry;
pub use crate::protocol::schema::{
    FieldPattern, FieldRules, FieldSpec, SchemaDescriptor, SchemaIr, SchemaLimits, PACKET_TYPE_KEY,
};
