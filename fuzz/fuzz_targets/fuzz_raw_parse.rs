#![no_main]

use libfuzzer_sys::fuzz_target;
use protowire::raw::{infer_schema, to_text, RawMessage};

fuzz_target!(|data: &[u8]| {
    // Schema-less parsing, printing and inference must never panic
    if let Ok(raw) = RawMessage::parse(data) {
        let _ = to_text(&raw);
        let _ = infer_schema(&raw);
        assert_eq!(raw.encode().len(), raw.encoded_len());
    }
});
