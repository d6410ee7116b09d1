//! # Envelope Frames
//!
//! Length-prefixed framing for encoded envelopes travelling over byte streams.
//!
//! ## Wire Format
//! ```text
//! [Magic(4) "XPKT"] [Version(1)] [Format(1)] [Length(4, BE)] [Payload(N)]
//! ```
//!
//! The format byte names the payload encoding (see [`WireFormat`]) so a
//! reader can choose the decoder without sniffing the payload.
//!
//! ## Security
//! - Payload length is checked against [`MAX_PAYLOAD_SIZE`] before any
//!   buffer is reserved
//! - Magic, version and format are validated before the length is trusted

use crate::config::{FRAME_VERSION, MAGIC_BYTES, MAX_PAYLOAD_SIZE};
use crate::core::serialization::WireFormat;
use crate::error::constants;
use crate::error::{CodecError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Size of the fixed frame header in bytes
pub const HEADER_SIZE: usize = 10;

/// One framed, encoded envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub format: WireFormat,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(format: WireFormat, payload: impl Into<Bytes>) -> Self {
        Self {
            format,
            payload: payload.into(),
        }
    }

    /// Serialize header and payload into one contiguous buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        self.write_to(&mut out)?;
        Ok(out.to_vec())
    }

    /// Parse exactly one frame from `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (format, len) = parse_header(bytes)?;
        let body = &bytes[HEADER_SIZE..];
        if body.len() < len {
            return Err(CodecError::TruncatedInput {
                needed: len,
                remaining: body.len(),
            });
        }
        if body.len() > len {
            return Err(CodecError::TrailingBytes {
                position: HEADER_SIZE + len,
            });
        }
        Ok(Frame::new(format, Bytes::copy_from_slice(body)))
    }

    fn write_to(&self, dst: &mut BytesMut) -> Result<()> {
        let len = self.payload.len();
        if len > MAX_PAYLOAD_SIZE {
            return Err(CodecError::AllocationLimitExceeded {
                requested: len,
                limit: MAX_PAYLOAD_SIZE,
            });
        }
        dst.reserve(HEADER_SIZE + len);
        dst.put_slice(&MAGIC_BYTES);
        dst.put_u8(FRAME_VERSION);
        dst.put_u8(self.format.format_byte());
        dst.put_u32(len as u32);
        dst.put_slice(&self.payload);
        Ok(())
    }
}

/// Validate a frame header and return the payload format and length
fn parse_header(bytes: &[u8]) -> Result<(WireFormat, usize)> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::TruncatedInput {
            needed: HEADER_SIZE,
            remaining: bytes.len(),
        });
    }
    if bytes[0..4] != MAGIC_BYTES {
        return Err(CodecError::InvalidEnvelope(
            constants::ERR_INVALID_MAGIC.to_string(),
        ));
    }
    if bytes[4] != FRAME_VERSION {
        return Err(CodecError::InvalidEnvelope(format!(
            "{}: {}",
            constants::ERR_UNSUPPORTED_VERSION,
            bytes[4]
        )));
    }
    let format = WireFormat::try_from_byte(bytes[5])?;
    let len = u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(CodecError::AllocationLimitExceeded {
            requested: len,
            limit: MAX_PAYLOAD_SIZE,
        });
    }
    Ok((format, len))
}

/// Tokio codec that splits a byte stream into [`Frame`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let (format, len) = parse_header(src)?;
        let total = HEADER_SIZE + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(HEADER_SIZE);
        Ok(Some(Frame {
            format,
            payload: frame.freeze(),
        }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        item.write_to(dst)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let frame = Frame::new(WireFormat::Text, b"{\"packetType\":\"/x\"}".to_vec());
        let bytes = frame.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"XPKT");
        assert_eq!(bytes[5], 0x02);
        assert_eq!(Frame::from_bytes(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = Frame::new(WireFormat::Binary, vec![0xc0]).to_bytes().unwrap();
        bytes[0] = b'Z';
        assert!(matches!(
            Frame::from_bytes(&bytes),
            Err(CodecError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_unknown_format_byte() {
        let mut bytes = Frame::new(WireFormat::Binary, vec![0xc0]).to_bytes().unwrap();
        bytes[5] = 0x09;
        assert!(matches!(
            Frame::from_bytes(&bytes),
            Err(CodecError::UnknownFormat(0x09))
        ));
    }

    #[test]
    fn test_oversized_length_rejected_before_reserve() {
        let mut src = BytesMut::new();
        src.put_slice(&MAGIC_BYTES);
        src.put_u8(FRAME_VERSION);
        src.put_u8(WireFormat::Binary.format_byte());
        src.put_u32(u32::MAX);
        assert!(matches!(
            FrameCodec.decode(&mut src),
            Err(CodecError::AllocationLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_partial_frame_waits() {
        let bytes = Frame::new(WireFormat::Binary, vec![1, 2, 3]).to_bytes().unwrap();
        let mut src = BytesMut::from(&bytes[..bytes.len() - 1]);
        assert!(FrameCodec.decode(&mut src).unwrap().is_none());
        src.put_u8(bytes[bytes.len() - 1]);
        let frame = FrameCodec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), &[1, 2, 3]);
        assert!(src.is_empty());
    }
}
