//! # Typed Messages
//!
//! Hand-written Rust structs that encode and decode without a runtime schema.
//! A type implements three methods of [`WireMessage`] using the helpers in
//! [`field`]; the trait supplies `encode_to_vec`, `decode` and `merge`.
//!
//! Packing is chosen per field at compile time by calling either
//! [`field::encode_packed`] or [`field::encode_unpacked`]. Decoding accepts
//! both layouts regardless of that choice.
//!
//! ## Example
//! ```rust
//! use protowire::core::reader::WireReader;
//! use protowire::core::wire::FieldKey;
//! use protowire::core::writer::WireWriter;
//! use protowire::error::Result;
//! use protowire::typed::{field, WireMessage};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct RepeatedPacked {
//!     d: Vec<i32>,
//! }
//!
//! impl WireMessage for RepeatedPacked {
//!     fn encode_raw(&self, w: &mut WireWriter) {
//!         field::encode_packed(4, &self.d, w);
//!     }
//!
//!     fn encoded_len(&self) -> usize {
//!         field::packed_len(4, &self.d)
//!     }
//!
//!     fn merge_field(&mut self, key: FieldKey, r: &mut WireReader<'_>, _depth: usize) -> Result<()> {
//!         match key.tag {
//!             4 => field::merge_repeated_varint(key.wire_type, &mut self.d, r),
//!             _ => field::skip(key, r),
//!         }
//!     }
//! }
//!
//! let msg = RepeatedPacked { d: vec![3, 270, 86942] };
//! let bytes = msg.encode_to_vec();
//! assert_eq!(bytes, [0x22, 0x06, 0x03, 0x8e, 0x02, 0x9e, 0xa7, 0x05]);
//! assert_eq!(RepeatedPacked::decode(&bytes)?, msg);
//! # Ok::<(), protowire::error::CodecError>(())
//! ```

use crate::config::DEFAULT_RECURSION_LIMIT;
use crate::core::reader::WireReader;
use crate::core::wire::FieldKey;
use crate::core::writer::WireWriter;
use crate::error::constants::ERR_RECURSION_LIMIT;
use crate::error::{CodecError, Result};
use bytes::Bytes;

/// A message type with compile-time field layout
pub trait WireMessage: Default {
    /// Write every present field in ascending tag order
    fn encode_raw(&self, w: &mut WireWriter);

    /// Exact size of `encode_raw` output
    fn encoded_len(&self) -> usize;

    /// Consume the value for `key` and fold it into `self`.
    ///
    /// `depth` is the nesting level of `self` and is passed on to
    /// [`field::merge_message`] for embedded messages.
    fn merge_field(&mut self, key: FieldKey, r: &mut WireReader<'_>, depth: usize) -> Result<()>;

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(self.encoded_len());
        self.encode_raw(&mut w);
        w.into_vec()
    }

    fn encode_to_bytes(&self) -> Bytes {
        let mut w = WireWriter::with_capacity(self.encoded_len());
        self.encode_raw(&mut w);
        w.into_bytes()
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut message = Self::default();
        message.merge(data)?;
        Ok(message)
    }

    /// Merge `data` into `self` with protobuf merge semantics
    fn merge(&mut self, data: &[u8]) -> Result<()> {
        let mut r = WireReader::new(data);
        merge_from(self, &mut r, 0)
    }
}

fn merge_from<M: WireMessage>(message: &mut M, r: &mut WireReader<'_>, depth: usize) -> Result<()> {
    while !r.is_empty() {
        let key = r.read_key()?;
        message
            .merge_field(key, r, depth)
            .map_err(|e| e.with_tag(key.tag))?;
    }
    Ok(())
}

/// Integer-like values carried in a varint
pub trait VarintScalar: Copy {
    fn to_wire(self) -> u64;
    /// Truncating conversion from the decoded 64-bit value
    fn from_wire(raw: u64) -> Self;
}

impl VarintScalar for u64 {
    fn to_wire(self) -> u64 {
        self
    }
    fn from_wire(raw: u64) -> Self {
        raw
    }
}

impl VarintScalar for u32 {
    fn to_wire(self) -> u64 {
        u64::from(self)
    }
    fn from_wire(raw: u64) -> Self {
        raw as u32
    }
}

impl VarintScalar for i64 {
    fn to_wire(self) -> u64 {
        self as u64
    }
    fn from_wire(raw: u64) -> Self {
        raw as i64
    }
}

impl VarintScalar for i32 {
    // sign-extended, so negatives take ten bytes
    fn to_wire(self) -> u64 {
        i64::from(self) as u64
    }
    fn from_wire(raw: u64) -> Self {
        raw as i32
    }
}

impl VarintScalar for bool {
    fn to_wire(self) -> u64 {
        u64::from(self)
    }
    fn from_wire(raw: u64) -> Self {
        raw != 0
    }
}

/// Per-field encode, size and merge helpers
pub mod field {
    use super::*;
    use crate::core::varint::encoded_len_varint;
    use crate::core::wire::WireType;
    use crate::core::writer::{key_len, length_delimited_len};
    use crate::error::constants::ERR_INVALID_UTF8;

    /// Skip a field this type does not define
    pub fn skip(key: FieldKey, r: &mut WireReader<'_>) -> Result<()> {
        r.skip_field(key.wire_type)
    }

    // --- varint scalars -------------------------------------------------

    pub fn encode_varint<T: VarintScalar>(tag: u32, value: T, w: &mut WireWriter) {
        w.put_varint_field(tag, value.to_wire());
    }

    pub fn varint_len<T: VarintScalar>(tag: u32, value: T) -> usize {
        key_len(tag) + encoded_len_varint(value.to_wire())
    }

    /// Last occurrence wins
    pub fn merge_varint<T: VarintScalar>(
        wire_type: WireType,
        value: &mut T,
        r: &mut WireReader<'_>,
    ) -> Result<()> {
        if wire_type != WireType::Varint {
            return r.skip_field(wire_type);
        }
        *value = T::from_wire(r.read_varint()?);
        Ok(())
    }

    /// Like [`merge_varint`] for an optional field
    pub fn merge_optional_varint<T: VarintScalar>(
        wire_type: WireType,
        value: &mut Option<T>,
        r: &mut WireReader<'_>,
    ) -> Result<()> {
        if wire_type != WireType::Varint {
            return r.skip_field(wire_type);
        }
        *value = Some(T::from_wire(r.read_varint()?));
        Ok(())
    }

    // --- repeated varints -----------------------------------------------

    /// One length-delimited entry; nothing for an empty slice
    pub fn encode_packed<T: VarintScalar>(tag: u32, values: &[T], w: &mut WireWriter) {
        w.put_packed_varints(tag, values.iter().map(|v| v.to_wire()));
    }

    pub fn packed_len<T: VarintScalar>(tag: u32, values: &[T]) -> usize {
        let payload: usize = values.iter().map(|v| encoded_len_varint(v.to_wire())).sum();
        if payload == 0 {
            0
        } else {
            length_delimited_len(tag, payload)
        }
    }

    /// One key + value pair per element
    pub fn encode_unpacked<T: VarintScalar>(tag: u32, values: &[T], w: &mut WireWriter) {
        w.put_unpacked_varints(tag, values.iter().map(|v| v.to_wire()));
    }

    pub fn unpacked_len<T: VarintScalar>(tag: u32, values: &[T]) -> usize {
        values
            .iter()
            .map(|v| key_len(tag) + encoded_len_varint(v.to_wire()))
            .sum()
    }

    /// Append a packed run or a single unpacked element, whichever arrived
    pub fn merge_repeated_varint<T: VarintScalar>(
        wire_type: WireType,
        values: &mut Vec<T>,
        r: &mut WireReader<'_>,
    ) -> Result<()> {
        match wire_type {
            WireType::Varint => values.push(T::from_wire(r.read_varint()?)),
            WireType::LengthDelimited => {
                let mut packed = r.read_nested()?;
                while !packed.is_empty() {
                    values.push(T::from_wire(packed.read_varint()?));
                }
            }
            other => r.skip_field(other)?,
        }
        Ok(())
    }

    // --- length-delimited -----------------------------------------------

    pub fn encode_string(tag: u32, value: &str, w: &mut WireWriter) {
        w.put_bytes_field(tag, value.as_bytes());
    }

    pub fn string_len(tag: u32, value: &str) -> usize {
        length_delimited_len(tag, value.len())
    }

    pub fn merge_string(wire_type: WireType, value: &mut String, r: &mut WireReader<'_>) -> Result<()> {
        if wire_type != WireType::LengthDelimited {
            return r.skip_field(wire_type);
        }
        *value = read_string(r)?;
        Ok(())
    }

    pub fn merge_optional_string(
        wire_type: WireType,
        value: &mut Option<String>,
        r: &mut WireReader<'_>,
    ) -> Result<()> {
        if wire_type != WireType::LengthDelimited {
            return r.skip_field(wire_type);
        }
        *value = Some(read_string(r)?);
        Ok(())
    }

    fn read_string(r: &mut WireReader<'_>) -> Result<String> {
        let bytes = r.read_length_delimited()?;
        let offset = r.offset() - bytes.len();
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::malformed(offset, ERR_INVALID_UTF8))
    }

    pub fn encode_bytes(tag: u32, value: &[u8], w: &mut WireWriter) {
        w.put_bytes_field(tag, value);
    }

    pub fn bytes_len(tag: u32, value: &[u8]) -> usize {
        length_delimited_len(tag, value.len())
    }

    pub fn merge_bytes(wire_type: WireType, value: &mut Vec<u8>, r: &mut WireReader<'_>) -> Result<()> {
        if wire_type != WireType::LengthDelimited {
            return r.skip_field(wire_type);
        }
        let bytes = r.read_length_delimited()?;
        value.clear();
        value.extend_from_slice(bytes);
        Ok(())
    }

    // --- embedded messages ----------------------------------------------

    /// Calls `value.encoded_len()` for the prefix, so a hand-written
    /// `encoded_len` runs once per nesting level. Deep trees belong in
    /// [`Codec`](crate::codec::Codec), which measures each message once.
    pub fn encode_message<M: WireMessage>(tag: u32, value: &M, w: &mut WireWriter) {
        w.put_key(tag, WireType::LengthDelimited);
        w.put_varint(value.encoded_len() as u64);
        value.encode_raw(w);
    }

    pub fn message_len<M: WireMessage>(tag: u32, value: &M) -> usize {
        length_delimited_len(tag, value.encoded_len())
    }

    /// Merge an occurrence into an existing message (singular field)
    pub fn merge_message<M: WireMessage>(
        wire_type: WireType,
        value: &mut M,
        r: &mut WireReader<'_>,
        depth: usize,
    ) -> Result<()> {
        if wire_type != WireType::LengthDelimited {
            return r.skip_field(wire_type);
        }
        let mut nested = r.read_nested()?;
        if depth + 1 > DEFAULT_RECURSION_LIMIT {
            return Err(CodecError::malformed(nested.offset(), ERR_RECURSION_LIMIT));
        }
        merge_from(value, &mut nested, depth + 1)
    }

    /// Decode an occurrence as a new element of a repeated field
    pub fn merge_repeated_message<M: WireMessage>(
        wire_type: WireType,
        values: &mut Vec<M>,
        r: &mut WireReader<'_>,
        depth: usize,
    ) -> Result<()> {
        if wire_type != WireType::LengthDelimited {
            return r.skip_field(wire_type);
        }
        let mut message = M::default();
        merge_message(wire_type, &mut message, r, depth)?;
        values.push(message);
        Ok(())
    }
}
