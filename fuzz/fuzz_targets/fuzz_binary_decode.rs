#![no_main]

use crosspacket::core::binary::BinaryCodec;
use crosspacket::protocol::catalog;
use crosspacket::EnvelopeCodec;
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};

static CODEC: OnceLock<EnvelopeCodec> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    // Bare value decode must never panic or over-allocate
    if let Ok(value) = BinaryCodec::default().decode(data) {
        // Anything that decodes must re-encode
        let _ = BinaryCodec::default().encode(&value);
    }

    let codec = CODEC.get_or_init(|| EnvelopeCodec::new(Arc::new(catalog::builtin_registry())));
    let _ = codec.decode_binary(data);
});
