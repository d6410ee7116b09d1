//! Integration tests for envelope serialization in both wire formats
//!
//! Covers lossless round-trips, cross-format stability and the documented
//! text-format integer boundary.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use crosspacket::protocol::catalog;
use crosspacket::{
    CodecError, EnvelopeCodec, Kind, PacketInstance, SchemaRegistry, Value, WireFormat,
};
use crosspacket::{FieldSpec, SchemaDescriptor};
use std::sync::Arc;
use time::macros::datetime;

const FORMATS: [WireFormat; 2] = [WireFormat::Text, WireFormat::Binary];

fn codec() -> EnvelopeCodec {
    EnvelopeCodec::new(Arc::new(catalog::builtin_registry()))
}

/// A registry with one small scratch schema next to the catalog
fn scratch_codec() -> EnvelopeCodec {
    let mut registry = catalog::builtin_registry();
    registry
        .register(SchemaDescriptor::new(
            "/test/Scratch",
            vec![
                FieldSpec::optional("n", Kind::Int),
                FieldSpec::optional("f", Kind::Float),
                FieldSpec::optional("blob", Kind::Binary),
                FieldSpec::optional("any", Kind::Dynamic),
            ],
        ))
        .unwrap();
    EnvelopeCodec::new(Arc::new(registry))
}

fn scratch(codec: &EnvelopeCodec, name: &str, value: Value) -> PacketInstance {
    PacketInstance::builder(codec.resolve("/test/Scratch").unwrap())
        .set(name, value)
        .unwrap()
        .build()
}

fn comprehensive(codec: &EnvelopeCodec) -> PacketInstance {
    PacketInstance::builder(codec.resolve(catalog::COMPREHENSIVE).unwrap())
        .set("int_field", -42)
        .unwrap()
        .set("float_field", 3.14159)
        .unwrap()
        .set("double_field", 2.718281828459045)
        .unwrap()
        .set("string_field", "héllo, wörld ✓")
        .unwrap()
        .set("bool_field", true)
        .unwrap()
        .set("datetime_field", datetime!(2024-02-29 23:59:59.123456789 UTC))
        .unwrap()
        .set("time_field", "14:30:00")
        .unwrap()
        .set(
            "list_field",
            Value::sequence([
                Value::Int(1),
                Value::from("two"),
                Value::Float(3.0),
                Value::Null,
            ]),
        )
        .unwrap()
        .set("list_int_field", Value::sequence([1, -2, 3]))
        .unwrap()
        .set("list_string_field", Value::sequence(["a", "b"]))
        .unwrap()
        .set(
            "map_field",
            Value::mapping([
                ("count", Value::Int(10)),
                ("ratio", Value::Float(0.5)),
            ]),
        )
        .unwrap()
        .set(
            "embedded_map_field",
            Value::mapping([(
                "inner",
                Value::mapping([
                    ("deep", Value::sequence([Value::Bool(false)])),
                    ("blob", Value::binary([0, 1, 2])),
                    ("when", Value::timestamp(datetime!(1969-07-20 20:17:40 UTC))),
                ]),
            )]),
        )
        .unwrap()
        .set(
            "map_string_dynamic_field",
            Value::mapping([("k", Value::from("v"))]),
        )
        .unwrap()
        .set("bytes_field", Value::binary([0xDE, 0xAD, 0xBE, 0xEF]))
        .unwrap()
        .build()
}

#[test]
fn test_comprehensive_roundtrip_both_formats() {
    let codec = codec();
    let packet = comprehensive(&codec);
    packet.validate().unwrap();

    for format in FORMATS {
        let bytes = codec.encode(&packet, format).unwrap();
        let decoded = codec.decode(&bytes, format).unwrap();
        assert_eq!(decoded, packet, "{format} round-trip");
    }
}

#[test]
fn test_cross_format_stability() {
    let codec = codec();
    let packet = comprehensive(&codec);
    let from_text = codec
        .decode_text(&codec.encode_text(&packet).unwrap())
        .unwrap();
    let from_binary = codec
        .decode_binary(&codec.encode_binary(&packet).unwrap())
        .unwrap();
    assert_eq!(from_text, from_binary);
}

#[test]
fn test_negative_one_in_binary() {
    let codec = scratch_codec();
    let packet = scratch(&codec, "n", Value::Int(-1));
    let decoded = codec
        .decode_binary(&codec.encode_binary(&packet).unwrap())
        .unwrap();
    assert_eq!(decoded.get("n"), Some(&Value::Int(-1)));
}

#[test]
fn test_small_float_in_binary() {
    let codec = scratch_codec();
    let packet = scratch(&codec, "f", Value::Float(0.0000001));
    let decoded = codec
        .decode_binary(&codec.encode_binary(&packet).unwrap())
        .unwrap();
    let f = decoded.get("f").and_then(Value::as_f64).unwrap();
    assert!((f - 0.0000001).abs() < 1e-10);
    // the codec itself is exact
    assert_eq!(f.to_bits(), 0.0000001f64.to_bits());
}

#[test]
fn test_blob_in_text() {
    let codec = scratch_codec();
    let packet = scratch(&codec, "blob", Value::binary([0xDE, 0xAD, 0xBE, 0xEF]));
    let bytes = codec.encode_text(&packet).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains(r#""blob":"3q2+7w==""#));
    let decoded = codec.decode_text(&bytes).unwrap();
    assert_eq!(
        decoded.get("blob").and_then(Value::as_bytes),
        Some(&[0xDE, 0xAD, 0xBE, 0xEF][..])
    );
}

#[test]
fn test_unknown_packet_type_in_text() {
    let result = codec().decode_text(br#"{"packetType":"/does/not/exist","a":1}"#);
    assert!(matches!(
        result,
        Err(CodecError::UnknownPacketType { type_id }) if type_id == "/does/not/exist"
    ));
}

#[test]
fn test_dynamic_list_keeps_element_kinds() {
    let codec = scratch_codec();
    let list = Value::sequence([
        Value::Int(1),
        Value::from("two"),
        Value::Float(3.0),
        Value::Bool(true),
        Value::Bool(false),
    ]);
    let packet = scratch(&codec, "any", list);

    for format in FORMATS {
        let decoded = codec
            .decode(&codec.encode(&packet, format).unwrap(), format)
            .unwrap();
        let kinds: Vec<Kind> = decoded
            .get("any")
            .and_then(Value::as_sequence)
            .unwrap()
            .iter()
            .map(Value::kind)
            .collect();
        assert_eq!(
            kinds,
            [Kind::Int, Kind::Text, Kind::Float, Kind::Bool, Kind::Bool],
            "{format}"
        );
    }
}

#[test]
fn test_absent_required_field_fails_decode() {
    let codec = codec();
    let packet = PacketInstance::builder(codec.resolve(catalog::MESSAGE).unwrap())
        .set("sender_id", "alice")
        .unwrap()
        .set("timestamp", datetime!(2024-01-01 00:00:00 UTC))
        .unwrap()
        .build();

    for format in FORMATS {
        let bytes = codec.encode(&packet, format).unwrap();
        assert!(matches!(
            codec.decode(&bytes, format),
            Err(CodecError::MissingRequiredField { name }) if name == "content"
        ));
    }
}

#[test]
fn test_safe_integer_boundary() {
    let codec = scratch_codec();
    let limit = 1i64 << 53;

    for value in [limit, -limit] {
        let packet = scratch(&codec, "n", Value::Int(value));
        let text = codec.decode_text(&codec.encode_text(&packet).unwrap()).unwrap();
        let binary = codec
            .decode_binary(&codec.encode_binary(&packet).unwrap())
            .unwrap();
        assert_eq!(text, binary);
        assert_eq!(text.get("n"), Some(&Value::Int(value)));
    }

    for value in [limit + 1, -(limit + 1), i64::MAX, i64::MIN] {
        let packet = scratch(&codec, "n", Value::Int(value));
        assert!(matches!(
            codec.encode_text(&packet),
            Err(CodecError::LossyIntegerEncoding { value: v }) if v == value
        ));
        // binary carries it exactly
        let binary = codec
            .decode_binary(&codec.encode_binary(&packet).unwrap())
            .unwrap();
        assert_eq!(binary.get("n"), Some(&Value::Int(value)));
    }
}

#[test]
fn test_binary_envelope_is_smaller() {
    let codec = codec();
    let packet = comprehensive(&codec);
    let text = codec.encode_text(&packet).unwrap();
    let binary = codec.encode_binary(&packet).unwrap();
    assert!(binary.len() < text.len());
}

#[test]
fn test_user_profile_optional_fields_absent() {
    let codec = codec();
    let packet = PacketInstance::builder(codec.resolve(catalog::USER_PROFILE).unwrap())
        .set("user_id", 12345)
        .unwrap()
        .set("username", "testuser")
        .unwrap()
        .set("email", "test@example.com")
        .unwrap()
        .set_optional("bio", None::<&str>)
        .unwrap()
        .set_optional("age", Some(30))
        .unwrap()
        .set("balance", 100.5)
        .unwrap()
        .set("tags", Value::sequence(["developer", "tester"]))
        .unwrap()
        .set("preferences", Value::mapping([("theme", Value::from("dark"))]))
        .unwrap()
        .set("created_at", datetime!(2023-06-15 08:00:00 UTC))
        .unwrap()
        .build();

    let text = String::from_utf8(codec.encode_text(&packet).unwrap()).unwrap();
    assert!(!text.contains("\"bio\""));
    assert!(!text.contains("\"avatar\""));
    assert!(text.contains("\"age\":30"));

    let decoded = codec.decode_text(text.as_bytes()).unwrap();
    assert_eq!(decoded, packet);
}

#[test]
fn test_secure_message_payload_is_opaque() {
    let codec = codec();
    let ciphertext: Vec<u8> = (0..=255).collect();
    let packet = PacketInstance::builder(codec.resolve(catalog::SECURE_MESSAGE).unwrap())
        .set("message_id", "msg-1")
        .unwrap()
        .set("sender_id", 1)
        .unwrap()
        .set("recipient_id", 2)
        .unwrap()
        .set("subject", "s")
        .unwrap()
        .set("body", "b")
        .unwrap()
        .set("attachments", Value::Sequence(Vec::new()))
        .unwrap()
        .set("encrypted_payload", Value::binary(ciphertext.clone()))
        .unwrap()
        .set("priority", 5)
        .unwrap()
        .set("is_read", false)
        .unwrap()
        .set("sent_at", datetime!(2024-01-01 00:00:00 UTC))
        .unwrap()
        .build();

    for format in FORMATS {
        let decoded = codec
            .decode(&codec.encode(&packet, format).unwrap(), format)
            .unwrap();
        assert_eq!(
            decoded.get("encrypted_payload").and_then(Value::as_bytes),
            Some(ciphertext.as_slice())
        );
    }
}

#[test]
fn test_registry_built_from_ir() {
    let mut registry = SchemaRegistry::new();
    let ir = crosspacket::SchemaIr::from_json(
        r#"[{"typeId": "/ir/Reading", "fields": [
            {"name": "sensor", "kind": "text", "required": true},
            {"name": "values", "kind": "sequence", "items": "float", "required": true}
        ]}]"#,
    )
    .unwrap();
    registry.register_all(ir).unwrap();
    let codec = EnvelopeCodec::new(Arc::new(registry));

    let packet = PacketInstance::builder(codec.resolve("/ir/Reading").unwrap())
        .set("sensor", "t1")
        .unwrap()
        .set("values", Value::sequence([1.5, 2.0]))
        .unwrap()
        .build();
    for format in FORMATS {
        let decoded = codec
            .decode(&codec.encode(&packet, format).unwrap(), format)
            .unwrap();
        assert_eq!(decoded, packet);
    }
}
