#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use taskboard_core::{OrderKey, key_between, validate_key};

/// Where to insert the next key among the ones generated so far.
#[derive(Debug, Arbitrary)]
enum Insert {
    Front,
    Back,
    After(u8),
}

fuzz_target!(|ops: Vec<Insert>| {
    if ops.len() > 512 {
        return;
    }
    let mut keys: Vec<OrderKey> = Vec::new();
    for op in ops {
        let (lo, hi) = match op {
            Insert::Front => (None, keys.first()),
            Insert::Back => (keys.last(), None),
            Insert::After(_) if keys.is_empty() => (None, None),
            Insert::After(i) => {
                let i = usize::from(i) % keys.len();
                (keys.get(i), keys.get(i + 1))
            }
        };
        let key = key_between(lo.map(OrderKey::as_str), hi.map(OrderKey::as_str));
        validate_key(key.as_str()).unwrap();
        if let Some(lo) = lo {
            assert!(lo < &key);
        }
        if let Some(hi) = hi {
            assert!(&key < hi);
        }
        let at = keys.partition_point(|k| k < &key);
        keys.insert(at, key);
    }
    // Sorted and collision-free.
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
});
