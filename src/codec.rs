//! # Schema-Driven Codec
//!
//! Encodes a [`Message`] into protocol-buffers wire format using a
//! [`MessageDescriptor`] from a [`Schema`], and decodes the inverse.
//!
//! ## Encoding
//! Fields are written in ascending tag order, so output is a pure function of
//! the message and the schema's packing flags. A sizing pass runs first: it
//! range-checks every value and records every nested message length in
//! pre-order, and the output buffer is then allocated once at the exact
//! size. The write pass consumes the recorded lengths in the same order, so
//! each nested message is measured once however deep it sits. Any error
//! aborts the call with nothing returned.
//!
//! ## Decoding
//! - Unknown tags are skipped by their wire type (or rejected in strict mode)
//! - Repeated numeric fields accept packed and unpacked occurrences, mixed
//!   freely; elements accumulate in stream order
//! - Singular scalars: last occurrence wins
//! - Singular messages: occurrences are merged
//!
//! ## Usage
//! ```rust
//! use protowire::codec::Codec;
//! use protowire::message::{Message, Value};
//! use protowire::schema::{FieldDescriptor, MessageDescriptor, ScalarType, Schema};
//!
//! let schema = Schema::new(
//!     None,
//!     vec![MessageDescriptor::new("RepeatedPacked")
//!         .field(FieldDescriptor::new("d", 4, ScalarType::Int32).packed())],
//! )?;
//! let codec = Codec::new(&schema);
//!
//! let mut msg = Message::new();
//! msg.extend(4, [3i32, 270, 86942]);
//! let bytes = codec.encode("RepeatedPacked", &msg)?;
//! assert_eq!(&bytes[..], &[0x22, 0x06, 0x03, 0x8e, 0x02, 0x9e, 0xa7, 0x05]);
//!
//! let decoded = codec.decode("RepeatedPacked", &bytes)?;
//! assert_eq!(decoded, msg);
//! # Ok::<(), protowire::error::CodecError>(())
//! ```

use crate::config::CodecConfig;
use crate::core::reader::WireReader;
use crate::core::varint::encoded_len_varint;
use crate::core::wire::{FieldKey, WireType};
use crate::core::writer::{key_len, WireWriter};
use crate::error::constants::{ERR_INVALID_UTF8, ERR_PACKED_WIDTH, ERR_RECURSION_LIMIT};
use crate::error::{CodecError, Result};
use crate::message::{FieldValue, Message, Value};
use crate::schema::{FieldDescriptor, FieldType, MessageDescriptor, ScalarType, Schema};
use crate::utils::metrics::CodecMetrics;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A scalar after range checking, ready to be written
#[derive(Debug, Clone, Copy)]
enum WireScalar<'v> {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(&'v [u8]),
}

impl WireScalar<'_> {
    /// Encoded size without key
    fn len(&self) -> usize {
        match self {
            WireScalar::Varint(v) => encoded_len_varint(*v),
            WireScalar::Fixed32(_) => 4,
            WireScalar::Fixed64(_) => 8,
            WireScalar::Bytes(b) => encoded_len_varint(b.len() as u64) + b.len(),
        }
    }

    fn write(&self, w: &mut WireWriter) {
        match *self {
            WireScalar::Varint(v) => w.put_varint(v),
            WireScalar::Fixed32(v) => w.put_fixed32(v),
            WireScalar::Fixed64(v) => w.put_fixed64(v),
            WireScalar::Bytes(b) => {
                w.put_varint(b.len() as u64);
                w.put_raw(b);
            }
        }
    }
}

/// Encoder/decoder bound to one schema
#[derive(Debug, Clone)]
pub struct Codec<'s> {
    schema: &'s Schema,
    config: CodecConfig,
    metrics: Option<Arc<CodecMetrics>>,
}

impl<'s> Codec<'s> {
    /// Codec with the default [`CodecConfig`]
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_config(schema, CodecConfig::default())
    }

    /// Codec with caller-supplied limits. `config` must pass
    /// [`CodecConfig::validate`]; use [`Codec::try_with_config`] for
    /// untrusted configuration.
    pub fn with_config(schema: &'s Schema, config: CodecConfig) -> Self {
        debug_assert!(
            config.validate().is_empty(),
            "invalid codec config: {:?}",
            config.validate()
        );
        Self {
            schema,
            config,
            metrics: None,
        }
    }

    /// Codec with validated limits.
    ///
    /// # Errors
    /// `ConfigError` listing every problem [`CodecConfig::validate`] finds,
    /// such as a zero recursion limit that would reject every nested message.
    pub fn try_with_config(schema: &'s Schema, config: CodecConfig) -> Result<Self> {
        config.validate_strict()?;
        Ok(Self::with_config(schema, config))
    }

    /// Record operation counts into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<CodecMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Exact size of the bytes [`Codec::encode`] would produce.
    ///
    /// # Errors
    /// The same errors `encode` reports, since this is its validation pass.
    pub fn encoded_len(&self, type_name: &str, message: &Message) -> Result<usize> {
        let descriptor = self.schema.message(type_name)?;
        self.message_len(descriptor, message, 0, &mut Vec::new())
    }

    /// Encode `message` as an instance of `type_name`.
    ///
    /// # Errors
    /// - `Encoding` if a value does not fit or does not match its declared type
    /// - `SchemaMismatch` if the message carries a tag the descriptor lacks, or
    ///   a repeated value in a singular field
    /// - `OversizedMessage` if the output would exceed `max_message_size`
    pub fn encode(&self, type_name: &str, message: &Message) -> Result<Bytes> {
        let result = self.encode_inner(type_name, message);
        match &result {
            Ok(bytes) => {
                if let Some(m) = &self.metrics {
                    m.message_encoded(bytes.len() as u64);
                }
                debug!(message_type = type_name, bytes = bytes.len(), "Encoded message");
            }
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.encode_error();
                }
                debug!(message_type = type_name, error = %e, "Encoding failed");
            }
        }
        result
    }

    fn encode_inner(&self, type_name: &str, message: &Message) -> Result<Bytes> {
        let descriptor = self.schema.message(type_name)?;
        let mut nested_lens = Vec::new();
        let len = self.message_len(descriptor, message, 0, &mut nested_lens)?;
        if len > self.config.max_message_size {
            return Err(CodecError::OversizedMessage(len));
        }
        let mut writer = WireWriter::with_capacity(len);
        self.write_message(descriptor, message, &mut nested_lens.iter(), &mut writer)?;
        debug_assert_eq!(writer.len(), len);
        Ok(writer.into_bytes())
    }

    /// Decode `data` as an instance of `type_name`.
    ///
    /// # Errors
    /// - `MalformedInput` for truncated or inconsistent input, with the byte
    ///   offset and tag of the failing field
    /// - `SchemaMismatch` for unknown tags when `reject_unknown_fields` is set
    /// - `OversizedMessage` if `data` exceeds `max_message_size`
    pub fn decode(&self, type_name: &str, data: &[u8]) -> Result<Message> {
        let mut message = Message::new();
        self.decode_into(type_name, data, &mut message)?;
        Ok(message)
    }

    /// Decode `data` and merge it into `message`.
    ///
    /// On error `message` may hold some of the decoded fields; callers that
    /// need atomicity should decode into a fresh message.
    pub fn decode_into(&self, type_name: &str, data: &[u8], message: &mut Message) -> Result<()> {
        let result = self.decode_inner(type_name, data, message);
        match &result {
            Ok(()) => {
                if let Some(m) = &self.metrics {
                    m.message_decoded(data.len() as u64);
                }
                debug!(message_type = type_name, bytes = data.len(), "Decoded message");
            }
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.decode_error();
                }
                debug!(message_type = type_name, error = %e, "Decoding failed");
            }
        }
        result
    }

    fn decode_inner(&self, type_name: &str, data: &[u8], message: &mut Message) -> Result<()> {
        let descriptor = self.schema.message(type_name)?;
        if data.len() > self.config.max_message_size {
            return Err(CodecError::OversizedMessage(data.len()));
        }
        let mut reader = WireReader::new(data);
        self.decode_message(descriptor, &mut reader, message, 0)
    }

    // ---------------------------------------------------------------------
    // sizing pass
    // ---------------------------------------------------------------------

    /// Size of `message`, pushing each nested message length onto
    /// `nested_lens` in pre-order
    fn message_len(
        &self,
        descriptor: &MessageDescriptor,
        message: &Message,
        depth: usize,
        nested_lens: &mut Vec<usize>,
    ) -> Result<usize> {
        let mut total = 0;
        for (&tag, value) in message {
            let field = self.field_for_encode(descriptor, tag, value)?;
            total += self.field_len(field, value.values(), depth, nested_lens)?;
        }
        Ok(total)
    }

    fn field_len(
        &self,
        field: &FieldDescriptor,
        values: &[Value],
        depth: usize,
        nested_lens: &mut Vec<usize>,
    ) -> Result<usize> {
        if field.packed {
            let FieldType::Scalar(scalar) = field.ty else {
                return Ok(0);
            };
            let mut payload = 0;
            for value in values {
                payload += to_wire_scalar(field.tag, scalar, value)?.len();
            }
            if payload == 0 {
                return Ok(0);
            }
            return Ok(key_len(field.tag) + encoded_len_varint(payload as u64) + payload);
        }

        let mut total = 0;
        for value in values {
            total += key_len(field.tag) + self.value_len(field, value, depth, nested_lens)?;
        }
        Ok(total)
    }

    fn value_len(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        depth: usize,
        nested_lens: &mut Vec<usize>,
    ) -> Result<usize> {
        match &field.ty {
            FieldType::Scalar(scalar) => Ok(to_wire_scalar(field.tag, *scalar, value)?.len()),
            FieldType::Message { message } => {
                let nested = expect_message(field, value)?;
                if depth + 1 > self.config.recursion_limit {
                    return Err(CodecError::Encoding {
                        tag: field.tag,
                        reason: format!(
                            "nesting exceeds recursion limit {}",
                            self.config.recursion_limit
                        ),
                    });
                }
                let descriptor = self.schema.message(message)?;
                let slot = nested_lens.len();
                nested_lens.push(0);
                let len = self.message_len(descriptor, nested, depth + 1, nested_lens)?;
                nested_lens[slot] = len;
                Ok(encoded_len_varint(len as u64) + len)
            }
        }
    }

    fn field_for_encode<'d>(
        &self,
        descriptor: &'d MessageDescriptor,
        tag: u32,
        value: &FieldValue,
    ) -> Result<&'d FieldDescriptor> {
        let field = descriptor
            .field_by_tag(tag)
            .ok_or_else(|| CodecError::SchemaMismatch {
                tag,
                offset: None,
                reason: format!("{} has no field with this tag", descriptor.name),
            })?;
        if !field.is_repeated() && matches!(value, FieldValue::Repeated(vs) if vs.len() != 1) {
            return Err(CodecError::SchemaMismatch {
                tag,
                offset: None,
                reason: format!(
                    "{}.{} is singular but holds {} values",
                    descriptor.name,
                    field.name,
                    value.values().len()
                ),
            });
        }
        Ok(field)
    }

    // ---------------------------------------------------------------------
    // write pass
    // ---------------------------------------------------------------------

    fn write_message(
        &self,
        descriptor: &MessageDescriptor,
        message: &Message,
        nested_lens: &mut std::slice::Iter<'_, usize>,
        w: &mut WireWriter,
    ) -> Result<()> {
        for (&tag, value) in message {
            let field = self.field_for_encode(descriptor, tag, value)?;
            self.write_field(field, value.values(), nested_lens, w)?;
        }
        Ok(())
    }

    fn write_field(
        &self,
        field: &FieldDescriptor,
        values: &[Value],
        nested_lens: &mut std::slice::Iter<'_, usize>,
        w: &mut WireWriter,
    ) -> Result<()> {
        match &field.ty {
            FieldType::Scalar(scalar) if field.packed => {
                let mut elements = Vec::with_capacity(values.len());
                for value in values {
                    elements.push(to_wire_scalar(field.tag, *scalar, value)?);
                }
                let payload: usize = elements.iter().map(WireScalar::len).sum();
                if payload == 0 {
                    return Ok(());
                }
                w.put_key(field.tag, WireType::LengthDelimited);
                w.put_varint(payload as u64);
                for element in &elements {
                    element.write(w);
                }
            }
            FieldType::Scalar(scalar) => {
                for value in values {
                    let element = to_wire_scalar(field.tag, *scalar, value)?;
                    w.put_key(field.tag, scalar.wire_type());
                    element.write(w);
                }
            }
            FieldType::Message { message } => {
                let descriptor = self.schema.message(message)?;
                for value in values {
                    let nested = expect_message(field, value)?;
                    // recorded by the sizing pass in the order we visit them
                    let len = *nested_lens.next().ok_or_else(|| CodecError::Encoding {
                        tag: field.tag,
                        reason: "nested length missing from sizing pass".to_string(),
                    })?;
                    w.put_key(field.tag, WireType::LengthDelimited);
                    w.put_varint(len as u64);
                    self.write_message(descriptor, nested, nested_lens, w)?;
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // decoding
    // ---------------------------------------------------------------------

    fn decode_message(
        &self,
        descriptor: &MessageDescriptor,
        reader: &mut WireReader<'_>,
        out: &mut Message,
        depth: usize,
    ) -> Result<()> {
        while !reader.is_empty() {
            let key_offset = reader.offset();
            let key = reader.read_key()?;

            let Some(field) = descriptor.field_by_tag(key.tag) else {
                self.skip_unknown(descriptor, key, key_offset, reader)?;
                continue;
            };

            if key.wire_type == field.wire_type() {
                self.decode_field(field, reader, out, depth)
                    .map_err(|e| e.with_tag(key.tag))?;
            } else if key.wire_type == WireType::LengthDelimited && field.accepts_packed() {
                decode_packed(field, reader, out).map_err(|e| e.with_tag(key.tag))?;
            } else {
                self.skip_unknown(descriptor, key, key_offset, reader)?;
            }
        }
        Ok(())
    }

    fn decode_field(
        &self,
        field: &FieldDescriptor,
        reader: &mut WireReader<'_>,
        out: &mut Message,
        depth: usize,
    ) -> Result<()> {
        let message_type = match &field.ty {
            FieldType::Scalar(scalar) => {
                let value = read_scalar(*scalar, reader)?;
                if field.is_repeated() {
                    out.push(field.tag, value);
                } else {
                    out.set(field.tag, value);
                }
                return Ok(());
            }
            FieldType::Message { message } => message,
        };

        let descriptor = self.schema.message(message_type)?;
        let mut nested = reader.read_nested()?;
        if depth + 1 > self.config.recursion_limit {
            return Err(CodecError::malformed(nested.offset(), ERR_RECURSION_LIMIT));
        }

        if !field.is_repeated() {
            if let Some(Value::Message(existing)) = out.get_mut(field.tag) {
                return self.decode_message(descriptor, &mut nested, existing, depth + 1);
            }
        }
        let mut message = Message::new();
        self.decode_message(descriptor, &mut nested, &mut message, depth + 1)?;
        if field.is_repeated() {
            out.push(field.tag, message);
        } else {
            out.set(field.tag, message);
        }
        Ok(())
    }

    fn skip_unknown(
        &self,
        descriptor: &MessageDescriptor,
        key: FieldKey,
        key_offset: usize,
        reader: &mut WireReader<'_>,
    ) -> Result<()> {
        if self.config.reject_unknown_fields {
            warn!(
                message_type = %descriptor.name,
                tag = key.tag,
                wire_type = %key.wire_type,
                offset = key_offset,
                "Rejecting unknown field"
            );
            return Err(CodecError::SchemaMismatch {
                tag: key.tag,
                offset: Some(key_offset),
                reason: format!(
                    "{} does not accept {} data for this tag",
                    descriptor.name, key.wire_type
                ),
            });
        }
        trace!(
            message_type = %descriptor.name,
            tag = key.tag,
            wire_type = %key.wire_type,
            offset = key_offset,
            "Skipping unknown field"
        );
        reader
            .skip_field(key.wire_type)
            .map_err(|e| e.with_tag(key.tag))?;
        if let Some(m) = &self.metrics {
            m.unknown_field_skipped();
        }
        Ok(())
    }
}

fn decode_packed(field: &FieldDescriptor, reader: &mut WireReader<'_>, out: &mut Message) -> Result<()> {
    let FieldType::Scalar(scalar) = field.ty else {
        return Ok(());
    };
    let mut packed = reader.read_nested()?;
    let width = match scalar.wire_type() {
        WireType::Fixed32 => 4,
        WireType::Fixed64 => 8,
        _ => 1,
    };
    if packed.remaining() % width != 0 {
        return Err(CodecError::malformed(packed.offset(), ERR_PACKED_WIDTH));
    }
    let values = out.repeated_mut(field.tag);
    while !packed.is_empty() {
        values.push(read_scalar(scalar, &mut packed)?);
    }
    Ok(())
}

fn read_scalar(scalar: ScalarType, reader: &mut WireReader<'_>) -> Result<Value> {
    let value = match scalar {
        ScalarType::Int32 | ScalarType::Enum => Value::Int(i64::from(reader.read_varint()? as i32)),
        ScalarType::Int64 => Value::Int(reader.read_varint()? as i64),
        ScalarType::Uint32 => Value::UInt(u64::from(reader.read_varint()? as u32)),
        ScalarType::Uint64 => Value::UInt(reader.read_varint()?),
        ScalarType::Bool => Value::Bool(reader.read_varint()? != 0),
        ScalarType::Fixed32 => Value::UInt(u64::from(reader.read_fixed32()?)),
        ScalarType::Float => Value::Float(f32::from_bits(reader.read_fixed32()?)),
        ScalarType::Fixed64 => Value::UInt(reader.read_fixed64()?),
        ScalarType::Double => Value::Double(f64::from_bits(reader.read_fixed64()?)),
        ScalarType::String => {
            let bytes = reader.read_length_delimited()?;
            let offset = reader.offset() - bytes.len();
            let text = std::str::from_utf8(bytes)
                .map_err(|_| CodecError::malformed(offset, ERR_INVALID_UTF8))?;
            Value::String(text.to_owned())
        }
        ScalarType::Bytes => Value::Bytes(Bytes::copy_from_slice(reader.read_length_delimited()?)),
    };
    Ok(value)
}

fn expect_message<'v>(field: &FieldDescriptor, value: &'v Value) -> Result<&'v Message> {
    value.as_message().ok_or_else(|| CodecError::Encoding {
        tag: field.tag,
        reason: format!("expected message, got {}", value.kind()),
    })
}

/// Range-check `value` against `scalar` and convert it to its wire form
fn to_wire_scalar(tag: u32, scalar: ScalarType, value: &Value) -> Result<WireScalar<'_>> {
    let out_of_range = |v: &dyn std::fmt::Display| CodecError::Encoding {
        tag,
        reason: format!("value {v} out of range for {}", scalar_name(scalar)),
    };
    let mismatch = || CodecError::Encoding {
        tag,
        reason: format!("expected {}, got {}", scalar_name(scalar), value.kind()),
    };

    let wire = match (scalar, value) {
        (ScalarType::Int32 | ScalarType::Enum, Value::Int(v)) => {
            let v = i32::try_from(*v).map_err(|_| out_of_range(v))?;
            WireScalar::Varint(i64::from(v) as u64)
        }
        (ScalarType::Int32 | ScalarType::Enum, Value::UInt(v)) => {
            let v = i32::try_from(*v).map_err(|_| out_of_range(v))?;
            WireScalar::Varint(i64::from(v) as u64)
        }
        (ScalarType::Int64, Value::Int(v)) => WireScalar::Varint(*v as u64),
        (ScalarType::Int64, Value::UInt(v)) => {
            let v = i64::try_from(*v).map_err(|_| out_of_range(v))?;
            WireScalar::Varint(v as u64)
        }
        (ScalarType::Uint32, Value::UInt(v)) => {
            let v = u32::try_from(*v).map_err(|_| out_of_range(v))?;
            WireScalar::Varint(u64::from(v))
        }
        (ScalarType::Uint32, Value::Int(v)) => {
            let v = u32::try_from(*v).map_err(|_| out_of_range(v))?;
            WireScalar::Varint(u64::from(v))
        }
        (ScalarType::Uint64, Value::UInt(v)) => WireScalar::Varint(*v),
        (ScalarType::Uint64, Value::Int(v)) => {
            WireScalar::Varint(u64::try_from(*v).map_err(|_| out_of_range(v))?)
        }
        (ScalarType::Bool, Value::Bool(b)) => WireScalar::Varint(u64::from(*b)),
        (ScalarType::Fixed32, Value::UInt(v)) => {
            WireScalar::Fixed32(u32::try_from(*v).map_err(|_| out_of_range(v))?)
        }
        (ScalarType::Fixed32, Value::Int(v)) => {
            WireScalar::Fixed32(u32::try_from(*v).map_err(|_| out_of_range(v))?)
        }
        (ScalarType::Fixed64, Value::UInt(v)) => WireScalar::Fixed64(*v),
        (ScalarType::Fixed64, Value::Int(v)) => {
            WireScalar::Fixed64(u64::try_from(*v).map_err(|_| out_of_range(v))?)
        }
        (ScalarType::Float, Value::Float(f)) => WireScalar::Fixed32(f.to_bits()),
        (ScalarType::Double, Value::Double(d)) => WireScalar::Fixed64(d.to_bits()),
        (ScalarType::Double, Value::Float(f)) => WireScalar::Fixed64(f64::from(*f).to_bits()),
        (ScalarType::String, Value::String(s)) => WireScalar::Bytes(s.as_bytes()),
        (ScalarType::Bytes, Value::Bytes(b)) => WireScalar::Bytes(b),
        (ScalarType::Bytes, Value::String(s)) => WireScalar::Bytes(s.as_bytes()),
        _ => return Err(mismatch()),
    };
    Ok(wire)
}

fn scalar_name(scalar: ScalarType) -> &'static str {
    match scalar {
        // proto_name renders enums as int32
        ScalarType::Enum => "enum",
        other => other.proto_name(),
    }
}
