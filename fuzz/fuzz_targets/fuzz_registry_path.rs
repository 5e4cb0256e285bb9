//! Fuzz target for registry path parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use winctl::registry::RegistryPath;

fuzz_target!(|data: &str| {
    let Ok(path) = RegistryPath::parse(data) else {
        return;
    };

    // A parsed path always prints back in canonical form and reparses to itself.
    let printed = path.to_string();
    let reparsed = RegistryPath::parse(&printed).expect("canonical path must parse");
    assert_eq!(reparsed, path);
    assert!(path.segments().all(|s| !s.is_empty()));
});
