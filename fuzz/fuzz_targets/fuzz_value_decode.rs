//! Fuzz target for decoding raw registry payloads.

#![no_main]

use libfuzzer_sys::fuzz_target;
use winctl::registry::Value;

fuzz_target!(|input: (u32, Vec<u8>)| {
    let (raw_type, data) = input;
    if data.len() > 100_000 {
        return;
    }

    // Must never panic; a decoded value re-encodes to a type decode accepts.
    if let Ok(value) = Value::decode(raw_type, data) {
        let (ty, bytes) = value.encode();
        let again = Value::decode(ty, bytes).expect("encoded value must decode");
        assert_eq!(again.kind(), value.kind());
    }
});
