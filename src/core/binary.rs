//! # Binary Codec
//!
//! MessagePack rendition of the value model.
//!
//! Unlike the text codec there is no precision policy here: every integer
//! width has a native marker, so an `Int` of any 64-bit value survives
//! exactly and is written with the smallest marker that holds it.
//!
//! ## Wire mapping
//! | Value       | Marker(s)                                            |
//! |-------------|------------------------------------------------------|
//! | `Null`      | `nil`                                                |
//! | `Bool`      | `true` / `false`                                     |
//! | `Int`       | fixint, `int8..int64`, `uint8..uint64`               |
//! | `Float`     | `float64` (`float32` accepted on decode)             |
//! | `Text`      | fixstr, `str8/16/32`                                 |
//! | `Binary`    | `bin8/16/32`, raw bytes                              |
//! | `Timestamp` | ext type -1, 12 bytes: `u32` nanos then `i64` seconds |
//! | `Sequence`  | fixarray, `array16/32`                               |
//! | `Mapping`   | fixmap, `map16/32` with string keys                  |
//!
//! Timestamps outside the years 0000-9999 fail with `MalformedTimestamp` in
//! both directions, matching what the text codec can spell.
//!
//! ## Hostile input
//! Every length or count is checked against the bytes that remain before
//! anything is allocated (`TruncatedInput`), then against [`CodecLimits`]
//! (`AllocationLimitExceeded`).

use crate::config::CodecLimits;
use crate::core::value::{check_timestamp_range, Mapping, Value};
use crate::error::{CodecError, Result};
use rmp::encode::{
    write_array_len, write_bin, write_bool, write_ext_meta, write_f64, write_map_len, write_nil,
    write_sint, write_str,
};
use rmp::Marker;
use std::io;
use time::OffsetDateTime;

/// MessagePack's reserved extension type for timestamps
pub const TIMESTAMP_EXT_TYPE: i8 = -1;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Encoder/decoder for the binary wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec {
    limits: CodecLimits,
}

impl BinaryCodec {
    pub fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Encode a value tree to MessagePack bytes
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(64);
        self.write_value(&mut out, value, 1)?;
        CodecLimits::guard(out.len(), self.limits.max_input_size)?;
        Ok(out)
    }

    /// Decode exactly one MessagePack value spanning all of `input`
    pub fn decode(&self, input: &[u8]) -> Result<Value> {
        CodecLimits::guard(input.len(), self.limits.max_input_size)?;
        let mut reader = Reader {
            input,
            pos: 0,
            limits: &self.limits,
        };
        let value = reader.read_value(1)?;
        if reader.pos != input.len() {
            return Err(CodecError::TrailingBytes {
                position: reader.pos,
            });
        }
        Ok(value)
    }

    fn write_value(&self, out: &mut Vec<u8>, value: &Value, level: usize) -> Result<()> {
        if level > self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.limits.max_depth,
            });
        }

        match value {
            Value::Null => write_nil(out)?,
            Value::Bool(b) => write_bool(out, *b)?,
            Value::Int(i) => {
                write_sint(out, *i).map_err(io::Error::from)?;
            }
            Value::Float(f) => write_f64(out, *f).map_err(io::Error::from)?,
            Value::Text(s) => {
                wire_len(s.len(), self.limits.max_string_len)?;
                write_str(out, s).map_err(io::Error::from)?;
            }
            Value::Binary(bytes) => {
                wire_len(bytes.len(), self.limits.max_binary_len)?;
                write_bin(out, bytes).map_err(io::Error::from)?;
            }
            Value::Timestamp(at) => write_timestamp(out, *at)?,
            Value::Sequence(items) => {
                let len = wire_len(items.len(), self.limits.max_collection_len)?;
                write_array_len(out, len).map_err(io::Error::from)?;
                for item in items {
                    self.write_value(out, item, level + 1)?;
                }
            }
            Value::Mapping(map) => {
                let len = wire_len(map.len(), self.limits.max_collection_len)?;
                write_map_len(out, len).map_err(io::Error::from)?;
                for (key, item) in map {
                    wire_len(key.len(), self.limits.max_string_len)?;
                    write_str(out, key).map_err(io::Error::from)?;
                    self.write_value(out, item, level + 1)?;
                }
            }
        }
        Ok(())
    }
}

/// Check a length against its limit and the 32-bit wire field
fn wire_len(len: usize, limit: usize) -> Result<u32> {
    CodecLimits::guard(len, limit)?;
    u32::try_from(len).map_err(|_| CodecError::AllocationLimitExceeded {
        requested: len,
        limit: u32::MAX as usize,
    })
}

fn write_timestamp(out: &mut Vec<u8>, at: OffsetDateTime) -> Result<()> {
    check_timestamp_range(at)?;
    write_ext_meta(out, 12, TIMESTAMP_EXT_TYPE).map_err(io::Error::from)?;
    out.extend_from_slice(&at.nanosecond().to_be_bytes());
    out.extend_from_slice(&at.unix_timestamp().to_be_bytes());
    Ok(())
}

/// Bounds-checked cursor over one input buffer
struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    limits: &'a CodecLimits,
}

impl<'a> Reader<'a> {
    #[inline]
    fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(CodecError::TruncatedInput {
                needed: n,
                remaining,
            });
        }
        let slice = &self.input[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_value(&mut self, level: usize) -> Result<Value> {
        if level > self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.limits.max_depth,
            });
        }

        let position = self.pos;
        let tag = self.read_u8()?;
        let value = match Marker::from_u8(tag) {
            Marker::Null => Value::Null,
            Marker::True => Value::Bool(true),
            Marker::False => Value::Bool(false),
            Marker::FixPos(v) => Value::Int(i64::from(v)),
            Marker::FixNeg(v) => Value::Int(i64::from(v)),
            Marker::U8 => Value::Int(i64::from(self.read_u8()?)),
            Marker::U16 => Value::Int(i64::from(self.read_u16()?)),
            Marker::U32 => Value::Int(i64::from(self.read_u32()?)),
            Marker::U64 => {
                let v = self.read_u64()?;
                Value::Int(i64::try_from(v).map_err(|_| CodecError::IntegerOutOfRange(v.to_string()))?)
            }
            Marker::I8 => Value::Int(i64::from(self.read_u8()? as i8)),
            Marker::I16 => Value::Int(i64::from(self.read_u16()? as i16)),
            Marker::I32 => Value::Int(i64::from(self.read_u32()? as i32)),
            Marker::I64 => Value::Int(self.read_u64()? as i64),
            Marker::F32 => Value::Float(f64::from(f32::from_bits(self.read_u32()?))),
            Marker::F64 => Value::Float(f64::from_bits(self.read_u64()?)),
            Marker::FixStr(n) => self.read_text(usize::from(n))?,
            Marker::Str8 => {
                let n = usize::from(self.read_u8()?);
                self.read_text(n)?
            }
            Marker::Str16 => {
                let n = usize::from(self.read_u16()?);
                self.read_text(n)?
            }
            Marker::Str32 => {
                let n = self.read_u32()? as usize;
                self.read_text(n)?
            }
            Marker::Bin8 => {
                let n = usize::from(self.read_u8()?);
                self.read_binary(n)?
            }
            Marker::Bin16 => {
                let n = usize::from(self.read_u16()?);
                self.read_binary(n)?
            }
            Marker::Bin32 => {
                let n = self.read_u32()? as usize;
                self.read_binary(n)?
            }
            Marker::FixArray(n) => self.read_sequence(usize::from(n), level)?,
            Marker::Array16 => {
                let n = usize::from(self.read_u16()?);
                self.read_sequence(n, level)?
            }
            Marker::Array32 => {
                let n = self.read_u32()? as usize;
                self.read_sequence(n, level)?
            }
            Marker::FixMap(n) => self.read_mapping(usize::from(n), level)?,
            Marker::Map16 => {
                let n = usize::from(self.read_u16()?);
                self.read_mapping(n, level)?
            }
            Marker::Map32 => {
                let n = self.read_u32()? as usize;
                self.read_mapping(n, level)?
            }
            Marker::FixExt1 => self.read_ext(1)?,
            Marker::FixExt2 => self.read_ext(2)?,
            Marker::FixExt4 => self.read_ext(4)?,
            Marker::FixExt8 => self.read_ext(8)?,
            Marker::FixExt16 => self.read_ext(16)?,
            Marker::Ext8 => {
                let n = usize::from(self.read_u8()?);
                self.read_ext(n)?
            }
            Marker::Ext16 => {
                let n = usize::from(self.read_u16()?);
                self.read_ext(n)?
            }
            Marker::Ext32 => {
                let n = self.read_u32()? as usize;
                self.read_ext(n)?
            }
            Marker::Reserved => return Err(CodecError::UnknownTag { tag, position }),
        };
        Ok(value)
    }

    fn read_str(&mut self, n: usize) -> Result<String> {
        let position = self.pos;
        let bytes = self.take(n)?;
        CodecLimits::guard(n, self.limits.max_string_len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8 { position })
    }

    fn read_text(&mut self, n: usize) -> Result<Value> {
        self.read_str(n).map(Value::Text)
    }

    fn read_binary(&mut self, n: usize) -> Result<Value> {
        let bytes = self.take(n)?;
        CodecLimits::guard(n, self.limits.max_binary_len)?;
        Ok(Value::Binary(bytes.to_vec()))
    }

    fn read_sequence(&mut self, count: usize, level: usize) -> Result<Value> {
        // every element needs at least one byte
        let remaining = self.remaining();
        if count > remaining {
            return Err(CodecError::TruncatedInput {
                needed: count,
                remaining,
            });
        }
        CodecLimits::guard(count, self.limits.max_collection_len)?;

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_value(level + 1)?);
        }
        Ok(Value::Sequence(items))
    }

    fn read_mapping(&mut self, count: usize, level: usize) -> Result<Value> {
        // every entry needs at least a key byte and a value byte
        let remaining = self.remaining();
        let needed = count.saturating_mul(2);
        if needed > remaining {
            return Err(CodecError::TruncatedInput { needed, remaining });
        }
        CodecLimits::guard(count, self.limits.max_collection_len)?;

        let mut map = Mapping::with_capacity(count);
        for _ in 0..count {
            let key = self.read_key()?;
            let value = self.read_value(level + 1)?;
            map.insert(key, value);
        }
        Ok(Value::Mapping(map))
    }

    fn read_key(&mut self) -> Result<String> {
        let position = self.pos;
        let n = match Marker::from_u8(self.read_u8()?) {
            Marker::FixStr(n) => usize::from(n),
            Marker::Str8 => usize::from(self.read_u8()?),
            Marker::Str16 => usize::from(self.read_u16()?),
            Marker::Str32 => self.read_u32()? as usize,
            _ => return Err(CodecError::InvalidMapKey { position }),
        };
        self.read_str(n)
    }

    fn read_ext(&mut self, n: usize) -> Result<Value> {
        let ext_type = self.read_u8()? as i8;
        let data = self.take(n)?;
        if ext_type != TIMESTAMP_EXT_TYPE {
            return Err(CodecError::UnsupportedExtension { ext_type });
        }
        decode_timestamp(data).map(Value::Timestamp)
    }
}

/// Accepts the timestamp32, timestamp64 and timestamp96 layouts
fn decode_timestamp(data: &[u8]) -> Result<OffsetDateTime> {
    let (seconds, nanos): (i64, u32) = match *data {
        [a, b, c, d] => (i64::from(u32::from_be_bytes([a, b, c, d])), 0),
        [a, b, c, d, e, f, g, h] => {
            let packed = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
            ((packed & 0x3_ffff_ffff) as i64, (packed >> 34) as u32)
        }
        [n0, n1, n2, n3, s0, s1, s2, s3, s4, s5, s6, s7] => (
            i64::from_be_bytes([s0, s1, s2, s3, s4, s5, s6, s7]),
            u32::from_be_bytes([n0, n1, n2, n3]),
        ),
        _ => {
            return Err(CodecError::MalformedTimestamp(format!(
                "extension payload of {} bytes",
                data.len()
            )))
        }
    };

    if i128::from(nanos) >= NANOS_PER_SECOND {
        return Err(CodecError::MalformedTimestamp(format!(
            "nanoseconds out of range: {nanos}"
        )));
    }

    let at = OffsetDateTime::from_unix_timestamp_nanos(
        i128::from(seconds) * NANOS_PER_SECOND + i128::from(nanos),
    )
    .map_err(|e| CodecError::MalformedTimestamp(e.to_string()))?;
    check_timestamp_range(at)?;
    Ok(at)
}
