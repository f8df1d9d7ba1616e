//! Output buffer for encoded fields.
//!
//! Writes are infallible. Range checks happen before anything reaches the
//! writer, so a failed encode never leaves partial output behind.

use crate::core::varint::{encode_varint, encoded_len_varint};
use crate::core::wire::{FieldKey, WireType};
use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer with room for `capacity` bytes before reallocating
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_key(&mut self, tag: u32, wire_type: WireType) {
        encode_varint(FieldKey::new(tag, wire_type).to_raw(), &mut self.buf);
    }

    #[inline]
    pub fn put_varint(&mut self, value: u64) {
        encode_varint(value, &mut self.buf);
    }

    #[inline]
    pub fn put_fixed32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    #[inline]
    pub fn put_fixed64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    /// Append bytes verbatim, no key or length
    #[inline]
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Key + varint value
    pub fn put_varint_field(&mut self, tag: u32, value: u64) {
        self.put_key(tag, WireType::Varint);
        self.put_varint(value);
    }

    /// Key + length + payload
    pub fn put_bytes_field(&mut self, tag: u32, payload: &[u8]) {
        self.put_key(tag, WireType::LengthDelimited);
        self.put_varint(payload.len() as u64);
        self.put_raw(payload);
    }

    /// One length-delimited entry holding every value as a varint
    pub fn put_packed_varints<I>(&mut self, tag: u32, values: I)
    where
        I: IntoIterator<Item = u64>,
        I::IntoIter: Clone,
    {
        let values = values.into_iter();
        let payload_len: usize = values.clone().map(encoded_len_varint).sum();
        if payload_len == 0 {
            return;
        }
        self.put_key(tag, WireType::LengthDelimited);
        self.put_varint(payload_len as u64);
        for value in values {
            self.put_varint(value);
        }
    }

    /// One key + varint pair per value
    pub fn put_unpacked_varints<I>(&mut self, tag: u32, values: I)
    where
        I: IntoIterator<Item = u64>,
    {
        for value in values {
            self.put_varint_field(tag, value);
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

impl AsRef<[u8]> for WireWriter {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/// Encoded size of a key for `tag`
#[inline]
pub fn key_len(tag: u32) -> usize {
    encoded_len_varint(u64::from(tag) << 3)
}

/// Encoded size of a length-delimited field with a `payload_len` byte payload
#[inline]
pub fn length_delimited_len(tag: u32, payload_len: usize) -> usize {
    key_len(tag) + encoded_len_varint(payload_len as u64) + payload_len
}
