//! Property-based tests using proptest
//!
//! These tests validate codec invariants across randomly generated value
//! trees and packets.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use crosspacket::core::binary::BinaryCodec;
use crosspacket::core::text::{TextCodec, MAX_SAFE_INTEGER};
use crosspacket::protocol::catalog;
use crosspacket::{CodecError, EnvelopeCodec, Frame, Mapping, PacketInstance, Value, WireFormat};
use proptest::prelude::*;
use std::sync::Arc;
use time::OffsetDateTime;

fn timestamp() -> impl Strategy<Value = Value> {
    // years 1900..2200, any nanosecond
    (-2_208_988_800i64..7_258_118_400i64, 0u32..1_000_000_000u32).prop_map(|(secs, nanos)| {
        let nanos = i128::from(secs) * 1_000_000_000 + i128::from(nanos);
        Value::Timestamp(OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap())
    })
}

/// Scalars that both formats carry exactly
fn portable_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).prop_map(Value::Int),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::Float),
        ".{0,24}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Binary),
        timestamp(),
    ]
}

fn portable_value() -> impl Strategy<Value = Value> {
    portable_scalar().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Sequence),
            prop::collection::vec(("[a-z$]{1,8}", inner), 0..8)
                .prop_map(|entries| Value::Mapping(entries.into_iter().collect::<Mapping>())),
        ]
    })
}

// Property: every portable value survives both codecs unchanged
proptest! {
    #[test]
    fn prop_value_roundtrip_both_codecs(value in portable_value()) {
        let text = TextCodec::default();
        let binary = BinaryCodec::default();

        let from_text = text.decode(&text.encode(&value).unwrap()).unwrap();
        prop_assert_eq!(&from_text, &value);

        let from_binary = binary.decode(&binary.encode(&value).unwrap()).unwrap();
        prop_assert_eq!(&from_binary, &value);
    }
}

// Property: the binary codec is exact for every 64-bit integer
proptest! {
    #[test]
    fn prop_binary_int_exact(n in any::<i64>()) {
        let codec = BinaryCodec::default();
        let decoded = codec.decode(&codec.encode(&Value::Int(n)).unwrap()).unwrap();
        prop_assert_eq!(decoded, Value::Int(n));
    }
}

// Property: the text codec never silently loses an integer
proptest! {
    #[test]
    fn prop_text_int_exact_or_rejected(n in any::<i64>()) {
        let codec = TextCodec::default();
        match codec.encode(&Value::Int(n)) {
            Ok(bytes) => {
                prop_assert!(n.unsigned_abs() <= MAX_SAFE_INTEGER.unsigned_abs());
                prop_assert_eq!(codec.decode(&bytes).unwrap(), Value::Int(n));
            }
            Err(CodecError::LossyIntegerEncoding { value }) => {
                prop_assert_eq!(value, n);
                prop_assert!(n.unsigned_abs() > MAX_SAFE_INTEGER.unsigned_abs());
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}

// Property: arbitrary bytes never panic either decoder
proptest! {
    #[test]
    fn prop_decoders_total_on_garbage(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = BinaryCodec::default().decode(&bytes);
        let _ = TextCodec::default().decode(&bytes);
        let _ = Frame::from_bytes(&bytes);
    }
}

// Property: encoding is deterministic
proptest! {
    #[test]
    fn prop_encoding_deterministic(value in portable_value()) {
        let codec = BinaryCodec::default();
        prop_assert_eq!(codec.encode(&value).unwrap(), codec.encode(&value).unwrap());
    }
}

// Property: chat messages round-trip through envelopes in both formats
proptest! {
    #[test]
    fn prop_message_packet_roundtrip(
        sender in "[a-z0-9_]{1,16}",
        content in ".{0,128}",
        at in timestamp(),
    ) {
        let codec = EnvelopeCodec::new(Arc::new(catalog::builtin_registry()));
        let packet = PacketInstance::builder(codec.resolve(catalog::MESSAGE).unwrap())
            .set("sender_id", sender)
            .unwrap()
            .set("content", content)
            .unwrap()
            .set("timestamp", at)
            .unwrap()
            .build();

        for format in [WireFormat::Text, WireFormat::Binary] {
            let decoded = codec.decode(&codec.encode(&packet, format).unwrap(), format).unwrap();
            prop_assert_eq!(&decoded, &packet);
        }
    }
}
