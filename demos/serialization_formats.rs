//! Example: One Packet, Two Wire Formats
//!
//! This example encodes a secure message packet as JSON and as MessagePack,
//! decodes both, shows what a receiver sees for an unknown packet type and
//! ends with the codec metrics.
//!
//! Run with: `cargo run --example serialization_formats`

#![allow(clippy::uninlined_format_args)]

use crosspacket::protocol::catalog;
use crosspacket::utils::global_metrics;
use crosspacket::{CodecError, EnvelopeCodec, PacketInstance, Value, WireFormat};
use std::sync::Arc;
use time::OffsetDateTime;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Dual-Format Packet Demo ===\n");

    let codec = EnvelopeCodec::new(Arc::new(catalog::builtin_registry()));
    let packet = PacketInstance::builder(codec.resolve(catalog::SECURE_MESSAGE)?)
        .set("message_id", "msg-0001")?
        .set("sender_id", 42)?
        .set("recipient_id", 7)?
        .set("subject", "status")?
        .set("body", "all systems nominal")?
        .set(
            "attachments",
            Value::sequence([Value::from("report.pdf"), Value::Int(2048)]),
        )?
        .set(
            "encrypted_payload",
            Value::binary([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]),
        )?
        .set("priority", 1)?
        .set("is_read", false)?
        .set("sent_at", OffsetDateTime::now_utc())?
        .build();

    println!("Packet type: {}\n", packet.type_id());

    for (index, format) in [WireFormat::Text, WireFormat::Binary].iter().enumerate() {
        println!("{}. {}", index + 1, format.name());

        let bytes = codec.encode(&packet, *format)?;
        println!("   - Encoded size: {} bytes", bytes.len());
        match format {
            WireFormat::Text => println!("   - JSON: {}", std::str::from_utf8(&bytes)?),
            WireFormat::Binary => println!("   - Hex: {:02X?}", &bytes[..bytes.len().min(24)]),
        }

        let recovered = codec.decode(&bytes, *format)?;
        println!(
            "   - Roundtrip: {}",
            if recovered == packet {
                "✓ Success"
            } else {
                "✗ Failed"
            }
        );
        println!();
    }

    println!("3. Unknown packet type");
    match codec.decode_text(br#"{"packetType":"/does/not/exist"}"#) {
        Err(CodecError::UnknownPacketType { type_id }) => {
            println!("   - Rejected: {}", type_id)
        }
        other => println!("   - Unexpected: {:?}", other),
    }

    let snapshot = global_metrics().snapshot();
    println!();
    println!(
        "4. Metrics: {} encoded, {} decoded, {} unknown type rejections",
        snapshot.packets_encoded, snapshot.packets_decoded, snapshot.unknown_type_rejections
    );
    global_metrics().log_metrics();

    Ok(())
}
