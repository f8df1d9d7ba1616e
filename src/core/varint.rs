//! Base-128 varints.
//!
//! Each byte carries 7 value bits, least significant group first. The high bit
//! is set on every byte except the last. A `u64` needs at most 10 bytes.

use crate::error::constants::{ERR_TRUNCATED_VARINT, ERR_VARINT_OVERFLOW};
use crate::error::{CodecError, Result};
use bytes::BufMut;

/// Longest valid varint encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Number of bytes `value` occupies once varint encoded.
#[inline]
pub fn encoded_len_varint(value: u64) -> usize {
    // index of the highest set bit, 0..=63, scaled onto 1..=10 bytes
    let high_bit = 63 - (value | 1).leading_zeros() as usize;
    (high_bit * 9 + 73) / 64
}

/// Append the varint encoding of `value` to `buf`.
#[inline]
pub fn encode_varint<B: BufMut>(mut value: u64, buf: &mut B) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Decode one varint from the front of `data`.
///
/// Returns the value and the number of bytes consumed. Offsets in errors are
/// relative to the start of `data`.
///
/// # Errors
/// `MalformedInput` if the input ends before the terminating byte, or the
/// encoding runs past 10 bytes or past bit 63.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(CodecError::malformed(0, ERR_VARINT_OVERFLOW));
        }
        // the 10th byte only has room for bit 63
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(CodecError::malformed(0, ERR_VARINT_OVERFLOW));
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CodecError::malformed(0, ERR_TRUNCATED_VARINT))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(value, &mut out);
        out
    }

    #[test]
    fn test_boundary_lengths() {
        for (value, len) in [
            (0u64, 1usize),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (u32::MAX as u64, 5),
            (u64::MAX, 10),
        ] {
            assert_eq!(encode(value).len(), len, "value {value}");
            assert_eq!(encoded_len_varint(value), len, "value {value}");
            assert_eq!(decode_varint(&encode(value)).unwrap(), (value, len));
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(150), vec![0x96, 0x01]);
        assert_eq!(encode(189), vec![0xbd, 0x01]);
        assert_eq!(encode(270), vec![0x8e, 0x02]);
        assert_eq!(encode(86_942), vec![0x9e, 0xa7, 0x05]);
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        let (value, used) = decode_varint(&[0xbd, 0x01, 0xff]).unwrap();
        assert_eq!(value, 189);
        assert_eq!(used, 2);
    }

    #[test]
    fn test_truncated_varint() {
        let err = decode_varint(&[0x80, 0x80]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedInput {
                reason: ERR_TRUNCATED_VARINT,
                ..
            }
        ));
        assert!(decode_varint(&[]).is_err());
    }

    #[test]
    fn test_overlong_varint() {
        let eleven = [0xff; 10]
            .iter()
            .copied()
            .chain(std::iter::once(0x01))
            .collect::<Vec<_>>();
        assert!(matches!(
            decode_varint(&eleven),
            Err(CodecError::MalformedInput {
                reason: ERR_VARINT_OVERFLOW,
                ..
            })
        ));

        let mut overflow = vec![0xff; 9];
        overflow.push(0x02);
        assert!(decode_varint(&overflow).is_err());
    }

    #[test]
    fn test_negative_i64_is_ten_bytes() {
        let bytes = encode(-1i64 as u64);
        assert_eq!(bytes.len(), 10);
        assert_eq!(decode_varint(&bytes).unwrap().0 as i64, -1);
    }
}
