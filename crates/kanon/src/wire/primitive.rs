//! Leaf-level encoders and decoders.
//!
//! Everything here is structure-free: varints, zigzag varints, fixed-width
//! little-endian words, and length-delimited byte runs. Encoders append to any
//! [`BufMut`]; decoders read from a slice and return `(value, consumed)`.
//!
//! The signed/unsigned split is deliberate and load-bearing:
//! [`encode_varint`] applies the zigzag transform, [`encode_uvarint`] does
//! not. Encoding signed `120` yields `[0xF0, 0x01]` while unsigned `120`
//! yields `[0x78]`.

use bytes::BufMut;

use crate::error::{Error, Result};

/// Maximum encoded length of a 64-bit varint
pub const MAX_VARINT_BYTES: usize = 10;

/// Encode an unsigned integer as a base-128 varint.
///
/// Little-endian groups of 7 bits, high bit set on all but the last byte.
pub fn encode_uvarint(buf: &mut impl BufMut, mut x: u64) {
    while x >= 0x80 {
        buf.put_u8((x as u8 & 0x7F) | 0x80);
        x >>= 7;
    }
    buf.put_u8(x as u8);
}

/// Decode a base-128 varint.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_uvarint(bz: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in bz.iter().enumerate() {
        if i >= MAX_VARINT_BYTES {
            return Err(Error::varint_decode(i));
        }
        // The tenth byte may only carry the top bit of a 64-bit value.
        if i == MAX_VARINT_BYTES - 1 && byte > 0x01 {
            return Err(Error::varint_decode(i));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::varint_decode(bz.len()))
}

/// Exact byte count [`encode_uvarint`] produces for `x`.
///
/// One byte per started 7-bit group, minimum 1, maximum 10.
pub fn uvarint_size(x: u64) -> usize {
    if x == 0 {
        return 1;
    }
    (64 - x.leading_zeros() as usize).div_ceil(7)
}

/// Encode a signed integer as a zigzag varint.
pub fn encode_varint(buf: &mut impl BufMut, x: i64) {
    // Arithmetic right shift smears the sign across all 64 bits.
    encode_uvarint(buf, ((x << 1) ^ (x >> 63)) as u64);
}

/// Decode a zigzag varint back into a signed integer.
pub fn decode_varint(bz: &[u8]) -> Result<(i64, usize)> {
    let (u, n) = decode_uvarint(bz)?;
    let x = ((u >> 1) as i64) ^ -((u & 1) as i64);
    Ok((x, n))
}

/// Encode a signed 8-bit integer (zigzag varint on the wire).
pub fn encode_int8(buf: &mut impl BufMut, x: i8) {
    encode_varint(buf, x as i64);
}

/// Decode a signed 8-bit integer, rejecting values outside `[-128, 127]`.
pub fn decode_int8(bz: &[u8]) -> Result<(i8, usize)> {
    let (x, n) = decode_varint(bz)?;
    let x = i8::try_from(x).map_err(|_| Error::range_overflow(x, "int8"))?;
    Ok((x, n))
}

/// Encode a signed 16-bit integer (zigzag varint on the wire).
pub fn encode_int16(buf: &mut impl BufMut, x: i16) {
    encode_varint(buf, x as i64);
}

/// Decode a signed 16-bit integer, rejecting values outside its range.
pub fn decode_int16(bz: &[u8]) -> Result<(i16, usize)> {
    let (x, n) = decode_varint(bz)?;
    let x = i16::try_from(x).map_err(|_| Error::range_overflow(x, "int16"))?;
    Ok((x, n))
}

/// Encode a 32-bit word as 4 little-endian bytes.
pub fn encode_fixed32(buf: &mut impl BufMut, x: u32) {
    buf.put_u32_le(x);
}

/// Decode 4 little-endian bytes into a 32-bit word.
pub fn decode_fixed32(bz: &[u8]) -> Result<(u32, usize)> {
    if bz.len() < 4 {
        return Err(Error::truncated(bz.len()));
    }
    let x = u32::from_le_bytes([bz[0], bz[1], bz[2], bz[3]]);
    Ok((x, 4))
}

/// Encode a 64-bit word as 8 little-endian bytes.
pub fn encode_fixed64(buf: &mut impl BufMut, x: u64) {
    buf.put_u64_le(x);
}

/// Decode 8 little-endian bytes into a 64-bit word.
pub fn decode_fixed64(bz: &[u8]) -> Result<(u64, usize)> {
    if bz.len() < 8 {
        return Err(Error::truncated(bz.len()));
    }
    let x = u64::from_le_bytes([
        bz[0], bz[1], bz[2], bz[3], bz[4], bz[5], bz[6], bz[7],
    ]);
    Ok((x, 8))
}

/// Encode a bool as a varint 0 or 1.
pub fn encode_bool(buf: &mut impl BufMut, b: bool) {
    encode_uvarint(buf, u64::from(b));
}

/// Decode a bool, rejecting any varint other than 0 or 1.
pub fn decode_bool(bz: &[u8]) -> Result<(bool, usize)> {
    let (u, n) = decode_uvarint(bz)?;
    match u {
        0 => Ok((false, n)),
        1 => Ok((true, n)),
        value => Err(Error::InvalidBool { value }),
    }
}

/// Encode a float as its 32-bit pattern in fixed32 form.
///
/// Bit reinterpretation of floats is inherently platform-dependent; this is
/// not a portability guarantee.
pub fn encode_float32(buf: &mut impl BufMut, f: f32) {
    encode_fixed32(buf, f.to_bits());
}

/// Decode a fixed32 word as a float bit pattern.
pub fn decode_float32(bz: &[u8]) -> Result<(f32, usize)> {
    let (bits, n) = decode_fixed32(bz)?;
    Ok((f32::from_bits(bits), n))
}

/// Encode a double as its 64-bit pattern in fixed64 form.
///
/// Same platform caveat as [`encode_float32`].
pub fn encode_float64(buf: &mut impl BufMut, f: f64) {
    encode_fixed64(buf, f.to_bits());
}

/// Decode a fixed64 word as a double bit pattern.
pub fn decode_float64(bz: &[u8]) -> Result<(f64, usize)> {
    let (bits, n) = decode_fixed64(bz)?;
    Ok((f64::from_bits(bits), n))
}

/// Encode a count-delimited byte run: uvarint length, then the raw bytes.
pub fn encode_byte_slice(buf: &mut impl BufMut, bz: &[u8]) {
    encode_uvarint(buf, bz.len() as u64);
    buf.put_slice(bz);
}

/// Decode a count-delimited byte run.
///
/// Returns the payload and the total bytes consumed including the length
/// prefix.
pub fn decode_byte_slice(bz: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (len, n) = decode_uvarint(bz)?;
    let len = usize::try_from(len).map_err(|_| Error::truncated(n))?;
    if bz.len() < n + len {
        return Err(Error::truncated(bz.len()));
    }
    Ok((bz[n..n + len].to_vec(), n + len))
}

/// Encode a string as a count-delimited byte run.
pub fn encode_string(buf: &mut impl BufMut, s: &str) {
    encode_byte_slice(buf, s.as_bytes());
}

/// Decode a count-delimited byte run into a string, validating UTF-8.
pub fn decode_string(bz: &[u8]) -> Result<(String, usize)> {
    let (raw, n) = decode_byte_slice(bz)?;
    Ok((String::from_utf8(raw)?, n))
}
