#![no_main]

use libfuzzer_sys::fuzz_target;
use taskboard_core::{RawDocument, Task, TaskList, decode_all};

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Decoding arbitrary documents must fail cleanly, never panic.
    let docs = vec![RawDocument::new("doc", value)];
    if let Err(err) = decode_all::<Task>(&docs) {
        assert_eq!(err.document_id(), "doc");
    }
    let _ = decode_all::<TaskList>(&docs);
});
