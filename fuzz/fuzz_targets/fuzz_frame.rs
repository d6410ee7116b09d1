#![no_main]

use bytes::BytesMut;
use crosspacket::{Frame, FrameCodec};
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let _ = Frame::from_bytes(data);

    // Stream decode until the buffer is exhausted or an error stops it
    let mut buffer = BytesMut::from(data);
    while let Ok(Some(_frame)) = FrameCodec.decode(&mut buffer) {}
});
