#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;
use protowire::codec::Codec;
use protowire::config::CodecConfig;
use protowire::schema::{FieldDescriptor, MessageDescriptor, ScalarType, Schema};

static SCHEMA: Lazy<Option<Schema>> = Lazy::new(|| {
    Schema::new(
        None,
        vec![MessageDescriptor::new("Node")
            .field(FieldDescriptor::new("name", 1, ScalarType::String))
            .field(FieldDescriptor::new("id", 2, ScalarType::Int64))
            .field(FieldDescriptor::new("values", 3, ScalarType::Int32).packed())
            .field(FieldDescriptor::new("weight", 4, ScalarType::Double))
            .field(FieldDescriptor::new("mask", 5, ScalarType::Fixed32))
            .field(FieldDescriptor::message("child", 6, "Node"))
            .field(FieldDescriptor::message("children", 7, "Node").repeated())],
    )
    .ok()
});

fuzz_target!(|data: &[u8]| {
    let Some(schema) = SCHEMA.as_ref() else {
        return;
    };
    // Lenient and strict decoding must both fail cleanly on hostile input
    let codec = Codec::new(schema);
    if let Ok(msg) = codec.decode("Node", data) {
        // Canonical output is a fixed point of decode then encode
        if let Ok(bytes) = codec.encode("Node", &msg) {
            let again = codec.decode("Node", &bytes).and_then(|m| codec.encode("Node", &m));
            assert_eq!(again.ok(), Some(bytes));
        }
    }
    let _ = Codec::with_config(schema, CodecConfig::strict()).decode("Node", data);
});
