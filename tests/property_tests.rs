//! Property-based tests using proptest
//!
//! These tests validate codec invariants across a wide range of randomly
//! generated messages and byte strings.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use protowire::codec::Codec;
use protowire::core::varint::{decode_varint, encode_varint, encoded_len_varint};
use protowire::error::CodecError;
use protowire::message::Message;
use protowire::raw::{infer_schema, to_text, RawMessage};
use protowire::schema::{FieldDescriptor, MessageDescriptor, ScalarType, Schema};

fn schema() -> Schema {
    Schema::new(
        Some("props".into()),
        vec![
            MessageDescriptor::new("Inner")
                .field(FieldDescriptor::new("name", 1, ScalarType::String))
                .field(FieldDescriptor::new("values", 2, ScalarType::Int64).packed()),
            MessageDescriptor::new("Sample")
                .field(FieldDescriptor::new("i32", 1, ScalarType::Int32))
                .field(FieldDescriptor::new("i64", 2, ScalarType::Int64))
                .field(FieldDescriptor::new("u32", 3, ScalarType::Uint32))
                .field(FieldDescriptor::new("u64", 4, ScalarType::Uint64))
                .field(FieldDescriptor::new("flag", 5, ScalarType::Bool))
                .field(FieldDescriptor::new("f", 6, ScalarType::Float))
                .field(FieldDescriptor::new("d", 7, ScalarType::Double))
                .field(FieldDescriptor::new("text", 8, ScalarType::String))
                .field(FieldDescriptor::new("blob", 9, ScalarType::Bytes))
                .field(FieldDescriptor::new("packed", 10, ScalarType::Int32).packed())
                .field(FieldDescriptor::new("unpacked", 11, ScalarType::Uint64).repeated())
                .field(FieldDescriptor::message("inner", 12, "Inner"))
                .field(FieldDescriptor::message("inners", 13, "Inner").repeated())
                .field(FieldDescriptor::new("fx32", 14, ScalarType::Fixed32))
                .field(FieldDescriptor::new("fx64", 1000, ScalarType::Fixed64)),
            MessageDescriptor::new("Packed")
                .field(FieldDescriptor::new("v", 1, ScalarType::Int64).packed()),
            MessageDescriptor::new("Unpacked")
                .field(FieldDescriptor::new("v", 1, ScalarType::Int64).repeated()),
        ],
    )
    .expect("valid schema")
}

fn inner_strategy() -> impl Strategy<Value = Message> {
    (option::of("[a-z]{0,8}"), vec(any::<i64>(), 0..5)).prop_map(|(name, values)| {
        let mut msg = Message::new();
        if let Some(name) = name {
            msg.set(1, name);
        }
        if !values.is_empty() {
            msg.extend(2, values);
        }
        msg
    })
}

fn sample_strategy() -> impl Strategy<Value = Message> {
    let scalars = (
        option::of(any::<i32>()),
        option::of(any::<i64>()),
        option::of(any::<u32>()),
        option::of(any::<u64>()),
        option::of(any::<bool>()),
        option::of(-1.0e6f32..1.0e6f32),
        option::of(-1.0e12f64..1.0e12f64),
        option::of(".{0,16}"),
        option::of(vec(any::<u8>(), 0..32)),
    );
    let composite = (
        vec(any::<i32>(), 0..8),
        vec(any::<u64>(), 0..8),
        option::of(inner_strategy()),
        vec(inner_strategy(), 0..3),
        option::of(any::<u32>()),
        option::of(any::<u64>()),
    );

    (scalars, composite).prop_map(|(scalars, composite)| {
        let (i32v, i64v, u32v, u64v, flag, f, d, text, blob) = scalars;
        let (packed, unpacked, inner, inners, fx32, fx64) = composite;

        let mut msg = Message::new();
        if let Some(v) = i32v {
            msg.set(1, v);
        }
        if let Some(v) = i64v {
            msg.set(2, v);
        }
        if let Some(v) = u32v {
            msg.set(3, v);
        }
        if let Some(v) = u64v {
            msg.set(4, v);
        }
        if let Some(v) = flag {
            msg.set(5, v);
        }
        if let Some(v) = f {
            msg.set(6, v);
        }
        if let Some(v) = d {
            msg.set(7, v);
        }
        if let Some(v) = text {
            msg.set(8, v);
        }
        if let Some(v) = blob {
            msg.set(9, v);
        }
        if !packed.is_empty() {
            msg.extend(10, packed);
        }
        if !unpacked.is_empty() {
            msg.extend(11, unpacked);
        }
        if let Some(v) = inner {
            msg.set(12, v);
        }
        if !inners.is_empty() {
            msg.extend(13, inners);
        }
        if let Some(v) = fx32 {
            msg.set(14, v);
        }
        if let Some(v) = fx64 {
            msg.set(1000, v);
        }
        msg
    })
}

// Property: decode(encode(m)) == m
proptest! {
    #[test]
    fn prop_codec_roundtrip(msg in sample_strategy()) {
        let schema = schema();
        let codec = Codec::new(&schema);
        let bytes = codec.encode("Sample", &msg).expect("encode should not fail");
        prop_assert_eq!(bytes.len(), codec.encoded_len("Sample", &msg).unwrap());
        let decoded = codec.decode("Sample", &bytes).expect("decode should not fail");
        prop_assert_eq!(decoded, msg);
    }
}

// Property: encoding is deterministic
proptest! {
    #[test]
    fn prop_encoding_deterministic(msg in sample_strategy()) {
        let schema = schema();
        let codec = Codec::new(&schema);
        prop_assert_eq!(codec.encode("Sample", &msg).unwrap(), codec.encode("Sample", &msg).unwrap());
    }
}

// Property: dropping the last byte of a non-empty encoding is always malformed
proptest! {
    #[test]
    fn prop_truncation_detected(msg in sample_strategy()) {
        let schema = schema();
        let codec = Codec::new(&schema);
        let bytes = codec.encode("Sample", &msg).unwrap();
        prop_assume!(!bytes.is_empty());
        let result = codec.decode("Sample", &bytes[..bytes.len() - 1]);
        prop_assert!(matches!(result, Err(CodecError::MalformedInput { .. })), "{:?}", result);
    }
}

// Property: packed and unpacked encodings decode to the same sequence
proptest! {
    #[test]
    fn prop_packed_unpacked_equivalence(values in vec(any::<i64>(), 1..20)) {
        let schema = schema();
        let codec = Codec::new(&schema);
        let mut msg = Message::new();
        msg.extend(1, values.clone());

        let packed = codec.encode("Packed", &msg).unwrap();
        let unpacked = codec.encode("Unpacked", &msg).unwrap();

        prop_assert_eq!(codec.decode("Unpacked", &packed).unwrap(), msg.clone());
        prop_assert_eq!(codec.decode("Packed", &unpacked).unwrap(), msg.clone());
        if values.len() >= 3 {
            prop_assert!(packed.len() <= unpacked.len());
        }
    }
}

// Property: a stream mixing both layouts decodes to the concatenation
proptest! {
    #[test]
    fn prop_mixed_layouts_concatenate(
        first in vec(any::<i64>(), 1..10),
        second in vec(any::<i64>(), 1..10),
    ) {
        let schema = schema();
        let codec = Codec::new(&schema);
        let mut a = Message::new();
        a.extend(1, first.clone());
        let mut b = Message::new();
        b.extend(1, second.clone());

        let mut stream = codec.encode("Packed", &a).unwrap().to_vec();
        stream.extend_from_slice(&codec.encode("Unpacked", &b).unwrap());

        let mut expected = Message::new();
        expected.extend(1, first.into_iter().chain(second));
        prop_assert_eq!(codec.decode("Packed", &stream).unwrap(), expected);
    }
}

// Property: varints round trip and report their exact length
proptest! {
    #[test]
    fn prop_varint_roundtrip(value in any::<u64>()) {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        prop_assert_eq!(buf.len(), encoded_len_varint(value));
        prop_assert_eq!(decode_varint(&buf).unwrap(), (value, buf.len()));
    }
}

// Property: arbitrary bytes never panic any decoder
proptest! {
    #[test]
    fn prop_arbitrary_bytes_never_panic(data in vec(any::<u8>(), 0..256)) {
        let schema = schema();
        let codec = Codec::new(&schema);
        let _ = codec.decode("Sample", &data);
        if let Ok(raw) = RawMessage::parse(&data) {
            let _ = to_text(&raw);
            let _ = infer_schema(&raw);
            prop_assert_eq!(raw.encode().len(), raw.encoded_len());
        }
    }
}

// Property: schema-less parse sees every field of a codec-encoded message
proptest! {
    #[test]
    fn prop_raw_parse_accepts_codec_output(msg in sample_strategy()) {
        let schema = schema();
        let codec = Codec::new(&schema);
        let bytes = codec.encode("Sample", &msg).unwrap();
        let raw = RawMessage::parse(&bytes).expect("codec output is well formed");
        for (tag, _) in &msg {
            prop_assert!(!raw.get(*tag).is_empty(), "tag {} missing", tag);
        }
    }
}
