//! Fuzz target for command-line argument quoting.

#![no_main]

use libfuzzer_sys::fuzz_target;
use winctl::process::quote_arg;

fuzz_target!(|data: &str| {
    let quoted = quote_arg(data);

    if data.is_empty() || data.contains([' ', '\t', '"']) {
        assert!(quoted.starts_with('"') && quoted.ends_with('"'));
        assert!(quoted.len() >= 2);
    } else {
        assert_eq!(quoted, data);
    }
});
