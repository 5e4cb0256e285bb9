//! Fuzz target for from_wide and from_multi_wide with arbitrary UTF-16 data.

#![no_main]

use libfuzzer_sys::fuzz_target;
use winctl::string::{from_multi_wide, from_wide};

fuzz_target!(|data: Vec<u16>| {
    // Limit size to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let result = from_wide(&data);
    let _ = from_multi_wide(&data);

    // from_wide stops at the first null
    if let Some(null_pos) = data.iter().position(|&c| c == 0) {
        if let Ok(s) = &result {
            if let Ok(expected) = from_wide(&data[..null_pos]) {
                assert_eq!(s, &expected, "should stop at first null");
            }
        }
    }
});
