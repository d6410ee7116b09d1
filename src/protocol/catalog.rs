//! Built-in packet schemas.
//!
//! These are the cross-language reference packets. Each is data only: a type
//! id and an ordered field layout.

use crate::core::value::Kind;
use crate::protocol::registry::SchemaRegistry;
use crate::protocol::schema::{FieldSpec, SchemaDescriptor};

pub const PING: &str = "/example/PingPacket";
pub const PONG: &str = "/example/PongPacket";
pub const MESSAGE: &str = "/chat/MessagePacket";
pub const DATA_CHUNK: &str = "/example/DataChunkPacket";
pub const USER_PROFILE: &str = "/example/UserProfilePacket";
pub const SECURE_MESSAGE: &str = "/example/SecureMessagePacket";
pub const COMPREHENSIVE: &str = "/test/ComprehensivePacket";

pub fn ping() -> SchemaDescriptor {
    SchemaDescriptor::new(
        PING,
        vec![
            FieldSpec::required("timestamp", Kind::Timestamp),
            FieldSpec::required("message", Kind::Text),
        ],
    )
    .with_description("Liveness probe")
}

pub fn pong() -> SchemaDescriptor {
    SchemaDescriptor::new(
        PONG,
        vec![
            FieldSpec::required("original_timestamp", Kind::Timestamp),
            FieldSpec::required("response_timestamp", Kind::Timestamp),
            FieldSpec::required("latency_ms", Kind::Int),
        ],
    )
    .with_description("Reply to a ping")
}

pub fn message() -> SchemaDescriptor {
    SchemaDescriptor::new(
        MESSAGE,
        vec![
            FieldSpec::required("sender_id", Kind::Text),
            FieldSpec::required("content", Kind::Text),
            FieldSpec::required("timestamp", Kind::Timestamp),
        ],
    )
    .with_description("Chat message")
}

pub fn data_chunk() -> SchemaDescriptor {
    SchemaDescriptor::new(
        DATA_CHUNK,
        vec![
            FieldSpec::required("chunk_index", Kind::Int),
            FieldSpec::required("total_chunks", Kind::Int),
            FieldSpec::required("data", Kind::Mapping),
            FieldSpec::required("checksum", Kind::Text),
        ],
    )
    .with_description("One piece of a chunked transfer")
}

pub fn user_profile() -> SchemaDescriptor {
    SchemaDescriptor::new(
        USER_PROFILE,
        vec![
            FieldSpec::required("user_id", Kind::Int),
            FieldSpec::required("username", Kind::Text),
            FieldSpec::required("email", Kind::Text),
            FieldSpec::optional("bio", Kind::Text),
            FieldSpec::optional("age", Kind::Int),
            FieldSpec::required("balance", Kind::Float),
            FieldSpec::required("tags", Kind::Sequence).with_items(Kind::Text),
            FieldSpec::required("preferences", Kind::Mapping),
            FieldSpec::optional("avatar", Kind::Binary),
            FieldSpec::required("created_at", Kind::Timestamp),
            FieldSpec::optional("last_login", Kind::Timestamp),
        ],
    )
    .with_description("User account profile")
}

pub fn secure_message() -> SchemaDescriptor {
    SchemaDescriptor::new(
        SECURE_MESSAGE,
        vec![
            FieldSpec::required("message_id", Kind::Text),
            FieldSpec::required("sender_id", Kind::Int),
            FieldSpec::required("recipient_id", Kind::Int),
            FieldSpec::required("subject", Kind::Text),
            FieldSpec::required("body", Kind::Text),
            FieldSpec::required("attachments", Kind::Sequence),
            // opaque ciphertext, never inspected here
            FieldSpec::optional("encrypted_payload", Kind::Binary),
            FieldSpec::required("priority", Kind::Int),
            FieldSpec::required("is_read", Kind::Bool),
            FieldSpec::required("sent_at", Kind::Timestamp),
        ],
    )
    .with_description("Message with an opaque encrypted payload")
}

pub fn comprehensive() -> SchemaDescriptor {
    SchemaDescriptor::new(
        COMPREHENSIVE,
        vec![
            FieldSpec::required("int_field", Kind::Int),
            FieldSpec::required("float_field", Kind::Float),
            FieldSpec::required("double_field", Kind::Float),
            FieldSpec::required("string_field", Kind::Text),
            FieldSpec::required("bool_field", Kind::Bool),
            FieldSpec::required("datetime_field", Kind::Timestamp),
            FieldSpec::required("time_field", Kind::Text).with_description("Time of day, HH:MM:SS"),
            FieldSpec::required("list_field", Kind::Sequence),
            FieldSpec::required("list_int_field", Kind::Sequence).with_items(Kind::Int),
            FieldSpec::required("list_string_field", Kind::Sequence).with_items(Kind::Text),
            FieldSpec::required("map_field", Kind::Mapping),
            FieldSpec::required("embedded_map_field", Kind::Mapping),
            FieldSpec::required("map_string_dynamic_field", Kind::Mapping),
            FieldSpec::required("bytes_field", Kind::Binary),
        ],
    )
    .with_description("Every field kind in one packet")
}

/// All built-in schemas in a stable order
pub fn all() -> Vec<SchemaDescriptor> {
    vec![
        ping(),
        pong(),
        message(),
        data_chunk(),
        user_profile(),
        secure_message(),
        comprehensive(),
    ]
}

/// A registry holding every built-in schema
pub fn builtin_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    for descriptor in all() {
        registry.insert(descriptor);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_schemas_are_valid() {
        let mut registry = SchemaRegistry::new();
        for descriptor in all() {
            assert!(descriptor.validate().is_ok(), "{}", descriptor.type_id);
            assert!(registry.register(descriptor).is_ok());
        }
        assert_eq!(registry.len(), 7);
        assert_eq!(builtin_registry().len(), 7);
    }

    #[test]
    fn test_user_profile_optional_fields() {
        let schema = user_profile();
        let optional: Vec<_> = schema
            .fields
            .iter()
            .filter(|f| !f.required)
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(optional, ["bio", "age", "avatar", "last_login"]);
    }
}
