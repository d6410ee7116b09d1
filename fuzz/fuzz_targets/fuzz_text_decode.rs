#![no_main]

use crosspacket::core::text::TextCodec;
use crosspacket::protocol::catalog;
use crosspacket::EnvelopeCodec;
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};

static CODEC: OnceLock<EnvelopeCodec> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let _ = TextCodec::default().decode(data);

    let codec = CODEC.get_or_init(|| EnvelopeCodec::new(Arc::new(catalog::builtin_registry())));
    if let Ok(packet) = codec.decode_text(data) {
        // A decoded packet must survive the binary format
        let bytes = codec.encode_binary(&packet).expect("re-encode decoded packet");
        let again = codec.decode_binary(&bytes).expect("decode re-encoded packet");
        assert_eq!(again, packet);
    }
});
