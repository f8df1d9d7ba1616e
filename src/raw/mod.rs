//! # Raw Messages
//!
//! Schema-less view of an encoded message, used to inspect payloads whose
//! `.proto` definition is not available.
//!
//! Without a schema the wire type is all there is to go on, so
//! length-delimited payloads are classified by content:
//!
//! 1. Printable ASCII (including empty) becomes [`RawValue::Text`]
//! 2. Anything [`looks_like_message`] accepts becomes [`RawValue::Message`]
//! 3. Everything else stays [`RawValue::Bytes`]
//!
//! The classification is a heuristic. A packed run of small integers can
//! parse as a nested message, and a message whose bytes happen to be
//! printable reads as text.
//!
//! ## Components
//! - **print**: indented text dump
//! - **infer**: `.proto` schema inference from a parsed tree

pub mod infer;
pub mod print;

use crate::config::DEFAULT_RECURSION_LIMIT;
use crate::core::reader::WireReader;
use crate::core::varint::encoded_len_varint;
use crate::core::wire::WireType;
use crate::core::writer::{key_len, WireWriter};
use crate::error::constants::ERR_GROUP_UNSUPPORTED;
use crate::error::{CodecError, Result};
use bytes::Bytes;
use std::collections::btree_map::{self, BTreeMap};
use tracing::trace;

pub use infer::{infer_schema, InferredSchema};
pub use print::to_text;

/// One field occurrence, typed by its wire type
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Text(String),
    Bytes(Bytes),
    Message(RawMessage),
}

impl RawValue {
    pub fn wire_type(&self) -> WireType {
        match self {
            RawValue::Varint(_) => WireType::Varint,
            RawValue::Fixed64(_) => WireType::Fixed64,
            RawValue::Fixed32(_) => WireType::Fixed32,
            RawValue::Text(_) | RawValue::Bytes(_) | RawValue::Message(_) => {
                WireType::LengthDelimited
            }
        }
    }

    fn value_len(&self) -> usize {
        match self {
            RawValue::Varint(v) => encoded_len_varint(*v),
            RawValue::Fixed64(_) => 8,
            RawValue::Fixed32(_) => 4,
            RawValue::Text(s) => encoded_len_varint(s.len() as u64) + s.len(),
            RawValue::Bytes(b) => encoded_len_varint(b.len() as u64) + b.len(),
            RawValue::Message(m) => {
                let len = m.encoded_len();
                encoded_len_varint(len as u64) + len
            }
        }
    }
}

/// Tag-ordered fields of a message parsed without a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMessage {
    fields: BTreeMap<u32, Vec<RawValue>>,
}

impl RawMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse with the default recursion limit
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with_limit(data, DEFAULT_RECURSION_LIMIT)
    }

    /// Parse `data`, classifying nested payloads as messages at most
    /// `recursion_limit` levels deep. Deeper payloads are kept as bytes.
    ///
    /// # Errors
    /// `MalformedInput` if the top-level stream is not well formed. Nested
    /// payloads never fail: a payload that does not parse is bytes.
    pub fn parse_with_limit(data: &[u8], recursion_limit: usize) -> Result<Self> {
        let mut reader = WireReader::new(data);
        parse_fields(&mut reader, 0, recursion_limit)
    }

    /// Append one occurrence of `tag`
    pub fn push(&mut self, tag: u32, value: RawValue) -> &mut Self {
        self.fields.entry(tag).or_default().push(value);
        self
    }

    /// All occurrences of `tag` in stream order
    pub fn get(&self, tag: u32) -> &[RawValue] {
        self.fields.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, Vec<RawValue>> {
        self.fields.iter()
    }

    pub fn encoded_len(&self) -> usize {
        self.iter()
            .flat_map(|(&tag, values)| values.iter().map(move |v| key_len(tag) + v.value_len()))
            .sum()
    }

    /// Re-serialise in ascending tag order
    pub fn encode(&self) -> Bytes {
        let mut w = WireWriter::with_capacity(self.encoded_len());
        self.write(&mut w);
        w.into_bytes()
    }

    fn write(&self, w: &mut WireWriter) {
        for (&tag, values) in self {
            for value in values {
                w.put_key(tag, value.wire_type());
                match value {
                    RawValue::Varint(v) => w.put_varint(*v),
                    RawValue::Fixed64(v) => w.put_fixed64(*v),
                    RawValue::Fixed32(v) => w.put_fixed32(*v),
                    RawValue::Text(s) => {
                        w.put_varint(s.len() as u64);
                        w.put_raw(s.as_bytes());
                    }
                    RawValue::Bytes(b) => {
                        w.put_varint(b.len() as u64);
                        w.put_raw(b);
                    }
                    RawValue::Message(m) => {
                        w.put_varint(m.encoded_len() as u64);
                        m.write(w);
                    }
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a RawMessage {
    type Item = (&'a u32, &'a Vec<RawValue>);
    type IntoIter = btree_map::Iter<'a, u32, Vec<RawValue>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

fn parse_fields(reader: &mut WireReader<'_>, depth: usize, limit: usize) -> Result<RawMessage> {
    let mut message = RawMessage::new();
    while !reader.is_empty() {
        let key_offset = reader.offset();
        let key = reader.read_key()?;
        let value = match key.wire_type {
            WireType::Varint => RawValue::Varint(reader.read_varint()?),
            WireType::Fixed64 => RawValue::Fixed64(reader.read_fixed64()?),
            WireType::Fixed32 => RawValue::Fixed32(reader.read_fixed32()?),
            WireType::LengthDelimited => {
                let payload = reader.read_length_delimited()?;
                let base = reader.offset() - payload.len();
                classify(payload, base, depth, limit)?
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(CodecError::malformed(key_offset, ERR_GROUP_UNSUPPORTED));
            }
        };
        message.push(key.tag, value);
    }
    Ok(message)
}

fn classify(payload: &[u8], base: usize, depth: usize, limit: usize) -> Result<RawValue> {
    if is_printable_ascii(payload) {
        // printable ASCII is valid UTF-8
        return Ok(RawValue::Text(payload.iter().map(|&b| char::from(b)).collect()));
    }
    if looks_like_message(payload) {
        if depth + 1 > limit {
            trace!(offset = base, "Nested payload beyond recursion limit kept as bytes");
        } else {
            let mut nested = WireReader::with_base(payload, base);
            return parse_fields(&mut nested, depth + 1, limit).map(RawValue::Message);
        }
    }
    Ok(RawValue::Bytes(Bytes::copy_from_slice(payload)))
}

fn is_printable_ascii(data: &[u8]) -> bool {
    data.iter().all(|b| (0x20..0x7f).contains(b))
}

/// Whether `data` parses as a non-empty message with non-decreasing tags
/// whose last field ends exactly at the end of the slice
pub fn looks_like_message(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let mut reader = WireReader::new(data);
    let mut prev_tag = 0;
    while !reader.is_empty() {
        let Ok(key) = reader.read_key() else {
            return false;
        };
        if key.tag < prev_tag || reader.skip_field(key.wire_type).is_err() {
            return false;
        }
        prev_tag = key.tag;
    }
    true
}
