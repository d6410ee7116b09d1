//! # Envelope Codec
//!
//! Turns [`PacketInstance`]s into self-identifying envelopes and back.
//!
//! An envelope is a mapping whose first key is the reserved
//! [`PACKET_TYPE_KEY`] holding the schema's type id, followed by the
//! declared fields in schema order, followed by any extra keys the instance
//! carried through from an earlier decode.
//!
//! ## Decode protocol
//! 1. Decode the bytes into a value tree (text or binary)
//! 2. Require a mapping root and read the type id
//! 3. Resolve the schema, failing with `UnknownPacketType`
//! 4. Project every declared field: absent required fields fail with
//!    `MissingRequiredField`, kind mismatches with `FieldKindMismatch`
//! 5. Keep the remaining keys as extras
//!
//! Projection is total: an error returns no instance at all.
//!
//! ## Text envelopes
//! Top-level fields declared `Binary` or `Timestamp` are written as bare
//! base64 and RFC 3339 strings, and converted back during projection.
//! Nested blobs and timestamps keep the text codec's tagged wrappers.
//! A bare blob is bounded by `max_binary_len`, the same limit it meets in
//! the binary format.
//!
//! Timestamp strings without an offset are read as UTC, in either format.

use crate::config::CodecLimits;
use crate::core::frame::Frame;
use crate::core::serialization::WireFormat;
use crate::core::text::{parse_binary_literal, parse_timestamp_literal, TextCodec};
use crate::core::value::{Kind, Mapping, Value};
use crate::error::constants;
use crate::error::{CodecError, Result};
use crate::protocol::packet::PacketInstance;
use crate::protocol::registry::{self, SchemaRegistry};
use crate::protocol::schema::{FieldSpec, SchemaDescriptor, PACKET_TYPE_KEY};
use crate::utils::metrics::{global_metrics, Timer};
use serde_json::{Map as JsonMap, Value as Json};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Schema-aware encoder/decoder for packet envelopes
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    registry: Arc<SchemaRegistry>,
    limits: CodecLimits,
}

impl EnvelopeCodec {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            limits: CodecLimits::default(),
        }
    }

    /// Codec bound to the process-wide registry
    pub fn global() -> Self {
        Self::new(registry::global())
    }

    pub fn with_limits(mut self, limits: CodecLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    pub fn resolve(&self, type_id: &str) -> Result<Arc<SchemaDescriptor>> {
        self.registry.resolve(type_id)
    }

    /// Build the envelope mapping with the type id written first.
    ///
    /// The type id always comes from the instance's schema.
    pub fn stamp_type(&self, instance: &PacketInstance) -> Mapping {
        let schema = instance.schema();
        let mut envelope =
            Mapping::with_capacity(1 + instance.fields().len() + instance.extras().len());
        envelope.insert(
            PACKET_TYPE_KEY.to_string(),
            Value::Text(schema.type_id.clone()),
        );
        for field in &schema.fields {
            if let Some(value) = instance.get(&field.name) {
                envelope.insert(field.name.clone(), value.clone());
            }
        }
        for (key, value) in instance.extras() {
            if key != PACKET_TYPE_KEY && !envelope.contains_key(key) {
                envelope.insert(key.clone(), value.clone());
            }
        }
        envelope
    }

    pub fn encode_text(&self, instance: &PacketInstance) -> Result<Vec<u8>> {
        self.encode(instance, WireFormat::Text)
    }

    pub fn decode_text(&self, input: &[u8]) -> Result<PacketInstance> {
        self.decode(input, WireFormat::Text)
    }

    pub fn encode_binary(&self, instance: &PacketInstance) -> Result<Vec<u8>> {
        self.encode(instance, WireFormat::Binary)
    }

    pub fn decode_binary(&self, input: &[u8]) -> Result<PacketInstance> {
        self.decode(input, WireFormat::Binary)
    }

    pub fn encode(&self, instance: &PacketInstance, format: WireFormat) -> Result<Vec<u8>> {
        let _timer = Timer::start("envelope_encode");
        let envelope = self.stamp_type(instance);
        let result = match format {
            WireFormat::Text => {
                let schema = instance.schema();
                TextCodec::new(self.limits).encode_root(&envelope, |key| {
                    schema
                        .field(key)
                        .is_some_and(|f| matches!(f.kind, Kind::Binary | Kind::Timestamp))
                })
            }
            WireFormat::Binary => format.encode_value(&Value::Mapping(envelope), self.limits),
        };

        match &result {
            Ok(bytes) => {
                global_metrics().packet_encoded(bytes.len() as u64);
                trace!(
                    type_id = %instance.type_id(),
                    format = %format,
                    bytes = bytes.len(),
                    "Encoded envelope"
                );
            }
            Err(e) => {
                global_metrics().encode_error();
                debug!(type_id = %instance.type_id(), format = %format, error = %e, "Encode failed");
            }
        }
        result
    }

    pub fn decode(&self, input: &[u8], format: WireFormat) -> Result<PacketInstance> {
        let _timer = Timer::start("envelope_decode");
        let root = match format {
            WireFormat::Text => {
                TextCodec::new(self.limits).decode_root(input, |root| self.blob_fields(root))
            }
            WireFormat::Binary => format.decode_value(input, self.limits),
        };
        let result = root.and_then(|root| self.project(root, format));

        match &result {
            Ok(instance) => {
                global_metrics().packet_decoded(input.len() as u64);
                trace!(
                    type_id = %instance.type_id(),
                    format = %format,
                    bytes = input.len(),
                    "Decoded envelope"
                );
            }
            Err(CodecError::UnknownPacketType { type_id }) => {
                global_metrics().unknown_type_rejected();
                warn!(type_id = %type_id, format = %format, "Rejected envelope with unknown packet type");
            }
            Err(e) => {
                global_metrics().decode_error();
                debug!(format = %format, bytes = input.len(), error = %e, "Decode failed");
            }
        }
        result
    }

    /// Encode and wrap in a format-tagged frame
    pub fn encode_framed(&self, instance: &PacketInstance, format: WireFormat) -> Result<Frame> {
        self.encode(instance, format)
            .map(|payload| Frame::new(format, payload))
    }

    /// Decode a frame using the format named in its header
    pub fn decode_framed(&self, frame: &Frame) -> Result<PacketInstance> {
        self.decode(&frame.payload, frame.format)
    }

    /// Declared blob fields of the schema a text root names, if any
    fn blob_fields(&self, root: &JsonMap<String, Json>) -> Vec<String> {
        root.get(PACKET_TYPE_KEY)
            .and_then(Json::as_str)
            .and_then(|type_id| self.registry.get(type_id))
            .map(|schema| {
                schema
                    .fields
                    .iter()
                    .filter(|f| f.kind == Kind::Binary)
                    .map(|f| f.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn project(&self, root: Value, format: WireFormat) -> Result<PacketInstance> {
        let Value::Mapping(mut envelope) = root else {
            return Err(CodecError::InvalidEnvelope(
                constants::ERR_ROOT_NOT_MAPPING.to_string(),
            ));
        };

        let type_id = match envelope.shift_remove(PACKET_TYPE_KEY) {
            Some(Value::Text(type_id)) => type_id,
            Some(other) => {
                return Err(CodecError::FieldKindMismatch {
                    name: PACKET_TYPE_KEY.to_string(),
                    expected: Kind::Text,
                    actual: other.kind(),
                })
            }
            None => {
                return Err(CodecError::MissingRequiredField {
                    name: PACKET_TYPE_KEY.to_string(),
                })
            }
        };

        let schema = self.resolve(&type_id)?;
        let mut values = Mapping::with_capacity(schema.fields.len());
        for field in &schema.fields {
            match envelope.shift_remove(&field.name) {
                Some(value) => {
                    let value = restore_kind(field, value, format, &self.limits)?;
                    field.check(&value)?;
                    values.insert(field.name.clone(), value);
                }
                None if field.required => {
                    return Err(CodecError::MissingRequiredField {
                        name: field.name.clone(),
                    })
                }
                None => {}
            }
        }

        Ok(PacketInstance::from_parts(schema, values, envelope))
    }
}

/// Convert a string back into the field's declared blob or timestamp kind
fn restore_kind(
    field: &FieldSpec,
    value: Value,
    format: WireFormat,
    limits: &CodecLimits,
) -> Result<Value> {
    match (field.kind, value, format) {
        (Kind::Binary, Value::Text(literal), WireFormat::Text) => {
            let bytes = parse_binary_literal(&literal)?;
            CodecLimits::guard(bytes.len(), limits.max_binary_len)?;
            Ok(Value::Binary(bytes))
        }
        (Kind::Timestamp, Value::Text(literal), _) => {
            parse_timestamp_literal(&literal).map(Value::Timestamp)
        }
        (_, value, _) => Ok(value),
    }
}

/// Encode with the global registry's codec
pub fn encode_text(instance: &PacketInstance) -> Result<Vec<u8>> {
    EnvelopeCodec::global().encode_text(instance)
}

/// Decode against the global registry
pub fn decode_text(input: &[u8]) -> Result<PacketInstance> {
    EnvelopeCodec::global().decode_text(input)
}

/// Encode with the global registry's codec
pub fn encode_binary(instance: &PacketInstance) -> Result<Vec<u8>> {
    EnvelopeCodec::global().encode_binary(instance)
}

/// Decode against the global registry
pub fn decode_binary(input: &[u8]) -> Result<PacketInstance> {
    EnvelopeCodec::global().decode_binary(input)
}

/// Add a schema to a registry that has not been shared yet
pub fn register_schema(registry: &mut SchemaRegistry, descriptor: SchemaDescriptor) -> Result<()> {
    registry.register(descriptor)
}

/// Resolve a type id in the global registry
pub fn resolve_schema(type_id: &str) -> Result<Arc<SchemaDescriptor>> {
    registry::global().resolve(type_id)
}
