#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge cases of the wire format: key validation, unknown fields, varint
//! limits, truncation and resource limits

use protowire::codec::Codec;
use protowire::config::CodecConfig;
use protowire::core::varint::{decode_varint, encode_varint, encoded_len_varint};
use protowire::core::wire::{FieldKey, WireType, MAX_TAG};
use protowire::core::writer::WireWriter;
use protowire::error::constants::*;
use protowire::error::CodecError;
use protowire::message::{Message, Value};
use protowire::raw::RawMessage;
use protowire::schema::{FieldDescriptor, MessageDescriptor, ScalarType, Schema};

fn person_schema() -> Schema {
    Schema::new(
        None,
        vec![MessageDescriptor::new("Person")
            .field(FieldDescriptor::new("name", 1, ScalarType::String))
            .field(FieldDescriptor::new("id", 2, ScalarType::Int32))],
    )
    .unwrap()
}

fn known_fields() -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_bytes_field(1, b"Al");
    w.put_varint_field(2, 7);
    w.into_vec()
}

fn expected_person() -> Message {
    Message::new().with(1, "Al").with(2, 7i32)
}

// ============================================================================
// UNKNOWN FIELDS
// ============================================================================

#[test]
fn test_unknown_fields_of_every_wire_type_are_skipped() {
    let schema = person_schema();
    let codec = Codec::new(&schema);

    let mut w = WireWriter::new();
    w.put_varint_field(10, 150);
    w.put_bytes_field(11, b"ignored payload");
    w.put_key(12, WireType::Fixed32);
    w.put_fixed32(0xdead_beef);
    w.put_key(13, WireType::Fixed64);
    w.put_fixed64(u64::MAX);
    let unknown = w.into_vec();

    // before, between and after the known fields
    let known = known_fields();
    let mut data = unknown.clone();
    data.extend_from_slice(&known[..4]);
    data.extend_from_slice(&unknown);
    data.extend_from_slice(&known[4..]);
    data.extend_from_slice(&unknown);

    assert_eq!(codec.decode("Person", &data).unwrap(), expected_person());
}

#[test]
fn test_strict_mode_rejects_each_unknown_wire_type() {
    let schema = person_schema();
    let codec = Codec::with_config(&schema, CodecConfig::strict());
    for unknown in [
        vec![0x50, 0x01],
        vec![0x5a, 0x00],
        vec![0x65, 0, 0, 0, 0],
        vec![0x69, 0, 0, 0, 0, 0, 0, 0, 0],
    ] {
        let mut data = known_fields();
        data.extend_from_slice(&unknown);
        match codec.decode("Person", &data) {
            Err(CodecError::SchemaMismatch { offset, .. }) => assert_eq!(offset, Some(6)),
            other => panic!("unexpected: {other:?}"),
        }
    }
    assert!(codec.decode("Person", &known_fields()).is_ok());
}

#[test]
fn test_truncated_unknown_field_is_malformed() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    let data = [0x5a, 0x05, b'a'];
    assert!(matches!(
        codec.decode("Person", &data),
        Err(CodecError::MalformedInput {
            offset: 1,
            tag: Some(11),
            reason: ERR_LENGTH_EXCEEDS_INPUT,
        })
    ));
}

// ============================================================================
// KEYS
// ============================================================================

#[test]
fn test_zero_tag_rejected() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    assert!(matches!(
        codec.decode("Person", &[0x00, 0x01]),
        Err(CodecError::MalformedInput {
            offset: 0,
            reason: ERR_ZERO_TAG,
            ..
        })
    ));
}

#[test]
fn test_invalid_wire_types_rejected() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    for key in [0x0eu8, 0x0f] {
        assert!(matches!(
            codec.decode("Person", &[key, 0x00]),
            Err(CodecError::MalformedInput {
                reason: ERR_INVALID_WIRE_TYPE,
                ..
            })
        ));
    }
}

#[test]
fn test_groups_rejected() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    // unknown tag 9 start-group
    assert!(matches!(
        codec.decode("Person", &[0x4b, 0x4c]),
        Err(CodecError::MalformedInput {
            reason: ERR_GROUP_UNSUPPORTED,
            ..
        })
    ));
    assert!(RawMessage::parse(&[0x0b, 0x0c]).is_err());
}

#[test]
fn test_max_tag_roundtrip() {
    let schema = Schema::new(
        None,
        vec![MessageDescriptor::new("Wide")
            .field(FieldDescriptor::new("last", MAX_TAG, ScalarType::Uint64))],
    )
    .unwrap();
    let codec = Codec::new(&schema);
    let msg = Message::new().with(MAX_TAG, 1u64);
    let bytes = codec.encode("Wide", &msg).unwrap();
    // a 29-bit tag needs a 5-byte key
    assert_eq!(bytes.len(), 5 + 1);
    assert_eq!(codec.decode("Wide", &bytes).unwrap(), msg);

    let too_large = (u64::from(MAX_TAG) + 1) << 3;
    assert!(matches!(
        FieldKey::from_raw(too_large, 0),
        Err(CodecError::MalformedInput {
            reason: ERR_TAG_OUT_OF_RANGE,
            ..
        })
    ));
}

// ============================================================================
// VARINTS
// ============================================================================

#[test]
fn test_varint_boundaries() {
    for (value, len) in [
        (0u64, 1),
        (127, 1),
        (128, 2),
        (16_383, 2),
        (16_384, 3),
        (u64::MAX, 10),
    ] {
        assert_eq!(encoded_len_varint(value), len, "length of {value}");
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        assert_eq!(buf.len(), len);
        assert_eq!(decode_varint(&buf).unwrap(), (value, len));
    }
}

#[test]
fn test_eleven_byte_varint_rejected() {
    let data = [0xff; 11];
    assert!(matches!(
        decode_varint(&data),
        Err(CodecError::MalformedInput {
            reason: ERR_VARINT_OVERFLOW,
            ..
        })
    ));
}

#[test]
fn test_tenth_byte_above_one_rejected() {
    let mut data = [0xff; 10];
    data[9] = 0x02;
    assert!(decode_varint(&data).is_err());
    data[9] = 0x01;
    assert_eq!(decode_varint(&data).unwrap(), (u64::MAX, 10));
}

#[test]
fn test_int32_decodes_low_bits() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    // id = 2^32 + 5 written as a 64-bit varint
    let mut w = WireWriter::new();
    w.put_varint_field(2, (1u64 << 32) + 5);
    let msg = codec.decode("Person", w.as_ref()).unwrap();
    assert_eq!(msg.get(2), Some(&Value::Int(5)));
}

// ============================================================================
// TRUNCATION AND LIMITS
// ============================================================================

#[test]
fn test_truncation_inside_a_field_fails() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    let data = known_fields();
    // byte 4 is the boundary between the two fields
    for cut in (1..data.len()).filter(|&cut| cut != 4) {
        let result = codec.decode("Person", &data[..cut]);
        assert!(
            matches!(result, Err(CodecError::MalformedInput { .. })),
            "cut at {cut}: {result:?}"
        );
    }
}

#[test]
fn test_empty_input_is_an_empty_message() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    assert!(codec.decode("Person", &[]).unwrap().is_empty());
    assert!(codec.encode("Person", &Message::new()).unwrap().is_empty());
    assert!(RawMessage::parse(&[]).unwrap().is_empty());
}

#[test]
fn test_present_zero_is_encoded() {
    let schema = person_schema();
    let codec = Codec::new(&schema);
    let msg = Message::new().with(2, 0i32).with(1, "");
    let bytes = codec.encode("Person", &msg).unwrap();
    assert_eq!(&bytes[..], &[0x0a, 0x00, 0x10, 0x00]);
    assert_eq!(codec.decode("Person", &bytes).unwrap(), msg);
}

#[test]
fn test_deep_nesting_hits_recursion_limit() {
    let schema = Schema::new(
        None,
        vec![MessageDescriptor::new("Node").field(FieldDescriptor::message("child", 1, "Node"))],
    )
    .unwrap();

    // 150 levels of `1 { ... }`, built inside out
    let mut data: Vec<u8> = Vec::new();
    for _ in 0..150 {
        let mut outer = vec![0x0a];
        encode_varint(data.len() as u64, &mut outer);
        outer.extend_from_slice(&data);
        data = outer;
    }

    let codec = Codec::new(&schema);
    assert!(matches!(
        codec.decode("Node", &data),
        Err(CodecError::MalformedInput {
            reason: ERR_RECURSION_LIMIT,
            ..
        })
    ));

    let relaxed = Codec::with_config(
        &schema,
        CodecConfig {
            recursion_limit: 200,
            ..CodecConfig::default()
        },
    );
    assert!(relaxed.decode("Node", &data).is_ok());
}
