//! Bounds-checked cursor over an encoded message.
//!
//! `WireReader` never reads past its slice. Offsets reported in errors are
//! absolute: a reader created for a nested payload carries the position of
//! that payload inside the top-level input.

use crate::core::varint::decode_varint;
use crate::core::wire::{FieldKey, WireType};
use crate::error::constants::{
    ERR_GROUP_UNSUPPORTED, ERR_LENGTH_EXCEEDS_INPUT, ERR_TRUNCATED_FIXED,
};
use crate::error::{CodecError, Result};

#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Reader over `data`, which starts at absolute offset `base`
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next unread byte
    #[inline]
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let start = self.offset();
        let (value, used) = decode_varint(&self.data[self.pos..]).map_err(|e| match e {
            CodecError::MalformedInput { reason, .. } => CodecError::malformed(start, reason),
            other => other,
        })?;
        self.pos += used;
        Ok(value)
    }

    pub fn read_key(&mut self) -> Result<FieldKey> {
        let start = self.offset();
        let raw = self.read_varint()?;
        FieldKey::from_raw(raw, start)
    }

    pub fn read_fixed32(&mut self) -> Result<u32> {
        let bytes = self.take(4, ERR_TRUNCATED_FIXED)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_fixed64(&mut self) -> Result<u64> {
        let bytes = self.take(8, ERR_TRUNCATED_FIXED)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a length prefix and return the payload it covers
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8]> {
        let start = self.offset();
        let len = self.read_varint()?;
        if len > self.remaining() as u64 {
            return Err(CodecError::malformed(start, ERR_LENGTH_EXCEEDS_INPUT));
        }
        self.take(len as usize, ERR_LENGTH_EXCEEDS_INPUT)
    }

    /// Read a length-delimited payload as a reader positioned on it
    pub fn read_nested(&mut self) -> Result<WireReader<'a>> {
        let payload = self.read_length_delimited()?;
        let base = self.offset() - payload.len();
        Ok(WireReader::with_base(payload, base))
    }

    /// Consume a value of the given wire type without interpreting it
    pub fn skip_field(&mut self, wire_type: WireType) -> Result<()> {
        match wire_type {
            WireType::Varint => self.read_varint().map(|_| ()),
            WireType::Fixed64 => self.take(8, ERR_TRUNCATED_FIXED).map(|_| ()),
            WireType::Fixed32 => self.take(4, ERR_TRUNCATED_FIXED).map(|_| ()),
            WireType::LengthDelimited => self.read_length_delimited().map(|_| ()),
            WireType::StartGroup | WireType::EndGroup => {
                Err(CodecError::malformed(self.offset(), ERR_GROUP_UNSUPPORTED))
            }
        }
    }

    fn take(&mut self, len: usize, reason: &'static str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::malformed(self.offset(), reason));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}
