//! Wire types and field keys.
//!
//! Every field on the wire starts with a key: `varint((tag << 3) | wire_type)`.

use crate::error::constants::{ERR_INVALID_WIRE_TYPE, ERR_TAG_OUT_OF_RANGE, ERR_ZERO_TAG};
use crate::error::{CodecError, Result};
use std::fmt;

/// Smallest valid field number
pub const MIN_TAG: u32 = 1;

/// Largest valid field number (29 bits)
pub const MAX_TAG: u32 = (1 << 29) - 1;

/// How a field's value is framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Base-128 varint
    Varint,
    /// 8 bytes, little endian
    Fixed64,
    /// Varint length followed by that many bytes
    LengthDelimited,
    /// Deprecated group start (recognised, not supported)
    StartGroup,
    /// Deprecated group end (recognised, not supported)
    EndGroup,
    /// 4 bytes, little endian
    Fixed32,
}

impl WireType {
    /// The 3-bit value stored in the key
    pub fn as_u8(self) -> u8 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::StartGroup => 3,
            WireType::EndGroup => 4,
            WireType::Fixed32 => 5,
        }
    }

    /// Detect wire type from the low 3 bits of a key
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            WireType::Varint => "VARINT",
            WireType::Fixed64 => "I64",
            WireType::LengthDelimited => "LEN",
            WireType::StartGroup => "SGROUP",
            WireType::EndGroup => "EGROUP",
            WireType::Fixed32 => "I32",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded field key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    pub tag: u32,
    pub wire_type: WireType,
}

impl FieldKey {
    pub fn new(tag: u32, wire_type: WireType) -> Self {
        Self { tag, wire_type }
    }

    /// The integer that gets varint encoded in front of the value
    #[inline]
    pub fn to_raw(self) -> u64 {
        (u64::from(self.tag) << 3) | u64::from(self.wire_type.as_u8())
    }

    /// Split a raw key into tag and wire type.
    ///
    /// `offset` is where the key started, used only for error reporting.
    pub fn from_raw(raw: u64, offset: usize) -> Result<Self> {
        let wire = WireType::from_u8((raw & 0x07) as u8)
            .ok_or_else(|| CodecError::malformed(offset, ERR_INVALID_WIRE_TYPE))?;
        let tag = raw >> 3;
        if tag == 0 {
            return Err(CodecError::malformed(offset, ERR_ZERO_TAG));
        }
        if tag > u64::from(MAX_TAG) {
            return Err(CodecError::malformed(offset, ERR_TAG_OUT_OF_RANGE));
        }
        Ok(Self::new(tag as u32, wire))
    }
}

/// Check a tag against the valid field number range
pub fn is_valid_tag(tag: u32) -> bool {
    (MIN_TAG..=MAX_TAG).contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_roundtrip() {
        for v in 0..=5u8 {
            let wt = WireType::from_u8(v).expect("valid wire type");
            assert_eq!(wt.as_u8(), v);
        }
        assert!(WireType::from_u8(6).is_none());
        assert!(WireType::from_u8(7).is_none());
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(FieldKey::new(1, WireType::LengthDelimited).to_raw(), 0x0a);
        assert_eq!(FieldKey::new(4, WireType::LengthDelimited).to_raw(), 0x22);
        assert_eq!(FieldKey::new(4, WireType::Varint).to_raw(), 0x20);
        let key = FieldKey::from_raw(0x12, 0).unwrap();
        assert_eq!(key, FieldKey::new(2, WireType::LengthDelimited));
    }

    #[test]
    fn test_rejects_zero_tag_and_bad_wire_type() {
        assert!(FieldKey::from_raw(0x02, 0).is_err());
        assert!(FieldKey::from_raw(0x0f, 0).is_err());
        assert!(FieldKey::from_raw((u64::from(MAX_TAG) + 1) << 3, 0).is_err());
        assert!(FieldKey::from_raw(u64::from(MAX_TAG) << 3, 0).is_ok());
    }

    #[test]
    fn test_tag_range() {
        assert!(!is_valid_tag(0));
        assert!(is_valid_tag(1));
        assert!(is_valid_tag(MAX_TAG));
        assert!(!is_valid_tag(MAX_TAG + 1));
    }
}
