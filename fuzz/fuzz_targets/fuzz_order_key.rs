#![no_main]

use taskboard_core::{key_between, validate_key};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 256 {
        return;
    }

    // validate_key must never panic.
    if validate_key(text).is_err() {
        return;
    }

    // A valid key has room on both sides.
    let after = key_between(Some(text), None);
    assert!(after.as_str() > text, "{after} must sort after {text}");
    validate_key(after.as_str()).unwrap();

    let before = key_between(None, Some(text));
    assert!(before.as_str() < text, "{before} must sort before {text}");
    validate_key(before.as_str()).unwrap();
});
