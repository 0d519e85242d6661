//! Wire model: wire types, field keys, and payload skipping.
//!
//! Every field entry starts with a varint key packing the field number and
//! a 3-bit wire type: `(number << 3) | wire_type`. The wire type determines
//! how the payload that follows is framed:
//!
//! - 0: Varint (bools, integers)
//! - 1: Fixed64 (8 raw little-endian bytes)
//! - 2: ByteLength (uvarint length, then raw bytes: strings, byte
//!   collections, nested messages, polymorphic envelopes)
//! - 5: Fixed32 (4 raw little-endian bytes)
//!
//! These primitives are a stable public surface: external tooling can walk
//! and pretty-print raw wire bytes with nothing but the key parser, the
//! varint decoders, and the wire type constants.

pub mod primitive;

use bytes::BufMut;

use crate::error::{Error, Result};
use primitive::{decode_uvarint, encode_uvarint};

/// Maximum valid field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// The four wire framing kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    Fixed64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    ByteLength = 2,
    /// 32-bit fixed-width
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::ByteLength),
            5 => Ok(WireType::Fixed32),
            _ => Err(Error::InvalidWireType { value }),
        }
    }
}

/// Pack a field number and wire type into one varint key.
pub fn encode_field_key(buf: &mut impl BufMut, number: u32, wire: WireType) {
    encode_uvarint(buf, (u64::from(number) << 3) | wire as u64);
}

/// Unpack a field key.
///
/// Returns the field number, the wire type, and the bytes consumed.
/// Field number zero is never valid.
pub fn decode_field_key(bz: &[u8]) -> Result<(u32, WireType, usize)> {
    let (key, n) = decode_uvarint(bz)?;
    let wire = WireType::try_from((key & 0x07) as u8)?;
    let number = key >> 3;
    if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
        return Err(Error::InvalidFieldNumber {
            number: number.min(u64::from(u32::MAX)) as u32,
            max: MAX_FIELD_NUMBER,
        });
    }
    Ok((number as u32, wire, n))
}

/// Compute the byte span of a payload so it can be skipped unread.
///
/// This is how forward-compatible unknown fields are passed over: a varint is
/// read and discarded, fixed widths are stepped over, and byte-length
/// payloads are skipped by their declared length.
pub fn skip_payload(wire: WireType, bz: &[u8]) -> Result<usize> {
    match wire {
        WireType::Varint => {
            let (_, n) = decode_uvarint(bz)?;
            Ok(n)
        }
        WireType::Fixed64 => {
            if bz.len() < 8 {
                return Err(Error::truncated(bz.len()));
            }
            Ok(8)
        }
        WireType::ByteLength => {
            let (len, n) = decode_uvarint(bz)?;
            let len = usize::try_from(len).map_err(|_| Error::truncated(n))?;
            if bz.len() < n + len {
                return Err(Error::truncated(bz.len()));
            }
            Ok(n + len)
        }
        WireType::Fixed32 => {
            if bz.len() < 4 {
                return Err(Error::truncated(bz.len()));
            }
            Ok(4)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_conversion() {
        assert_eq!(WireType::try_from(0).unwrap(), WireType::Varint);
        assert_eq!(WireType::try_from(1).unwrap(), WireType::Fixed64);
        assert_eq!(WireType::try_from(2).unwrap(), WireType::ByteLength);
        assert_eq!(WireType::try_from(5).unwrap(), WireType::Fixed32);
        assert!(WireType::try_from(3).is_err());
        assert!(WireType::try_from(4).is_err());
        assert!(WireType::try_from(6).is_err());
    }

    #[test]
    fn test_field_key_roundtrip() {
        let mut buf = Vec::new();
        encode_field_key(&mut buf, 1, WireType::ByteLength);
        assert_eq!(buf, vec![0x0A]);
        assert_eq!(
            decode_field_key(&buf).unwrap(),
            (1, WireType::ByteLength, 1)
        );

        buf.clear();
        encode_field_key(&mut buf, 300, WireType::Varint);
        let (number, wire, n) = decode_field_key(&buf).unwrap();
        assert_eq!((number, wire), (300, WireType::Varint));
        assert_eq!(n, buf.len());
    }

    #[test]
    fn test_field_number_zero_rejected() {
        assert!(matches!(
            decode_field_key(&[0x00]),
            Err(Error::InvalidFieldNumber { number: 0, .. })
        ));
    }

    #[test]
    fn test_skip_payload_spans() {
        // Varint: one value.
        assert_eq!(skip_payload(WireType::Varint, &[0x96, 0x01, 0xFF]).unwrap(), 2);
        // Fixed widths.
        assert_eq!(skip_payload(WireType::Fixed32, &[0; 6]).unwrap(), 4);
        assert_eq!(skip_payload(WireType::Fixed64, &[0; 9]).unwrap(), 8);
        assert!(skip_payload(WireType::Fixed64, &[0; 7]).is_err());
        // ByteLength: prefix plus declared bytes.
        assert_eq!(
            skip_payload(WireType::ByteLength, &[0x05, b'h', b'e', b'l', b'l', b'o']).unwrap(),
            6
        );
        assert!(skip_payload(WireType::ByteLength, &[0x05, b'h', b'i']).is_err());
    }
}
