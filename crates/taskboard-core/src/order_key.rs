#![forbid(unsafe_code)]

//! Fractional order keys.
//!
//! Keys are dense base-62 strings whose byte-wise ordering matches display
//! order. A new key can always be produced strictly between two existing
//! keys, so moving one entity never renumbers its siblings.
//!
//! # Key format
//!
//! ```text
//!   a 0 V
//!   │ │ └── fractional part (optional, never ends in '0')
//!   │ └──── integer digits
//!   └────── head: 'a'..='z' → 1..=26 digits (non-negative)
//!                 'Z'..='A' → 1..=26 digits (negative)
//! ```
//!
//! `key_between(None, None)` is `"a0"`. Appending repeatedly walks
//! `a0 → a1 → … → az → b00 → …`; prepending walks `a0 → Zz → Zy → …`.
//!
//! # Invariants
//!
//! 1. For valid `a < b`, `a < key_between(a, b) < b`.
//! 2. Every produced key passes [`validate_key`].
//! 3. The reserved minimum (`'A'` followed by 26 zeros) is never produced.
//!
//! # Failure Modes
//!
//! Nothing here panics. A bound that is malformed, or an upper bound that
//! is not strictly above the lower bound, is dropped and the widest key
//! consistent with the remaining bound is returned.

use std::cmp::Ordering;

use crate::error::OrderKeyError;
use crate::model::{OrderKey, Ordered};

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ZERO: u8 = b'0';
const BASE: usize = 62;
const SMALLEST_INTEGER: &str = "A00000000000000000000000000";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Produce a key strictly between `before` and `after`.
///
/// `None` on either side means "unbounded" on that side.
#[must_use]
pub fn key_between(before: Option<&str>, after: Option<&str>) -> OrderKey {
    let before = before.filter(|k| validate_key(k).is_ok());
    let after = after.filter(|k| validate_key(k).is_ok());
    let after = match (before, after) {
        (Some(a), Some(b)) if a >= b => None,
        (_, b) => b,
    };
    OrderKey::from_raw(generate(before, after))
}

/// Key that sorts after every ordered item in `items`.
#[must_use]
pub fn key_at_end<T: Ordered>(items: &[T]) -> OrderKey {
    let keys = sorted_keys(items);
    key_between(keys.last().copied(), None)
}

/// Key for inserting at `index` among the ordered items in `items`.
///
/// Items are sorted by key first; items without a key are ignored. An index
/// of zero yields a key before the first item, an index at or past the end
/// yields a key after the last item.
///
/// Siblings may share a key when two clients wrote concurrently. The upper
/// bound is then the next strictly greater key, so the result never equals
/// any sibling's key.
#[must_use]
pub fn key_at_index<T: Ordered>(items: &[T], index: usize) -> OrderKey {
    let keys = sorted_keys(items);
    if keys.is_empty() {
        return key_between(None, None);
    }
    if index == 0 {
        return key_between(None, keys.first().copied());
    }
    if index >= keys.len() {
        return key_between(keys.last().copied(), None);
    }
    let lower = keys[index - 1];
    let upper = keys[index..].iter().copied().find(|k| *k > lower);
    key_between(Some(lower), upper)
}

/// Compare two optional keys. Missing or empty keys sort last.
#[must_use]
pub fn compare_order(a: Option<&str>, b: Option<&str>) -> Ordering {
    let a = a.filter(|k| !k.is_empty());
    let b = b.filter(|k| !k.is_empty());
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by order key; missing keys go last and keep their relative
/// position.
pub fn sort_by_order<T: Ordered>(items: &mut [T]) {
    items.sort_by(|a, b| {
        compare_order(
            a.order().map(OrderKey::as_str),
            b.order().map(OrderKey::as_str),
        )
    });
}

/// Check that `key` is a well-formed order key.
pub fn validate_key(key: &str) -> Result<(), OrderKeyError> {
    if key.is_empty() {
        return Err(OrderKeyError::Empty);
    }
    if key == SMALLEST_INTEGER {
        return Err(OrderKeyError::Reserved);
    }
    if let Some(bad) = key.bytes().find(|c| digit_value(*c).is_none()) {
        return Err(OrderKeyError::InvalidDigit {
            key: key.to_owned(),
            digit: bad as char,
        });
    }
    let int_len = integer_length(key.as_bytes()[0]).ok_or_else(|| OrderKeyError::InvalidHead {
        key: key.to_owned(),
    })?;
    if int_len > key.len() {
        return Err(OrderKeyError::Truncated {
            key: key.to_owned(),
        });
    }
    if key.len() > int_len && key.as_bytes().last() == Some(&ZERO) {
        return Err(OrderKeyError::TrailingZero {
            key: key.to_owned(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn sorted_keys<T: Ordered>(items: &[T]) -> Vec<&str> {
    let mut keys: Vec<&str> = items
        .iter()
        .filter_map(|item| item.order().map(OrderKey::as_str))
        .filter(|k| !k.is_empty())
        .collect();
    keys.sort_unstable();
    keys
}

fn digit_value(c: u8) -> Option<usize> {
    match c {
        b'0'..=b'9' => Some((c - b'0') as usize),
        b'A'..=b'Z' => Some((c - b'A') as usize + 10),
        b'a'..=b'z' => Some((c - b'a') as usize + 36),
        _ => None,
    }
}

/// Total length (head included) of the integer part introduced by `head`.
fn integer_length(head: u8) -> Option<usize> {
    match head {
        b'a'..=b'z' => Some((head - b'a') as usize + 2),
        b'A'..=b'Z' => Some((b'Z' - head) as usize + 2),
        _ => None,
    }
}

/// Split a validated key into (integer part, fractional part).
fn split_key(key: &str) -> (&str, &str) {
    let len = integer_length(key.as_bytes()[0]).unwrap_or(key.len());
    key.split_at(len.min(key.len()))
}

/// Both bounds are valid and `before < after` when both are present.
fn generate(before: Option<&str>, after: Option<&str>) -> String {
    match (before, after) {
        (None, None) => "a0".to_owned(),
        (None, Some(b)) => {
            let (ib, fb) = split_key(b);
            if ib == SMALLEST_INTEGER {
                return format!("{ib}{}", midpoint_str("", Some(fb)));
            }
            if ib.len() < b.len() {
                return ib.to_owned();
            }
            match decrement_integer(ib) {
                Some(dec) => dec,
                None => format!("{ib}{}", midpoint_str("", Some(fb))),
            }
        }
        (Some(a), None) => {
            let (ia, fa) = split_key(a);
            match increment_integer(ia) {
                Some(inc) => inc,
                None => format!("{ia}{}", midpoint_str(fa, None)),
            }
        }
        (Some(a), Some(b)) => {
            let (ia, fa) = split_key(a);
            let (ib, fb) = split_key(b);
            if ia == ib {
                return format!("{ia}{}", midpoint_str(fa, Some(fb)));
            }
            match increment_integer(ia) {
                Some(inc) if inc.as_str() < b => inc,
                _ => format!("{ia}{}", midpoint_str(fa, None)),
            }
        }
    }
}

fn midpoint_str(a: &str, b: Option<&str>) -> String {
    let bytes = midpoint(a.as_bytes(), b.map(str::as_bytes));
    // Only base-62 ASCII digits are ever pushed.
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Midpoint of two fractional parts, `a < b`, neither ending in `'0'`.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Vec<u8> {
    if let Some(b) = b {
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(ZERO) == b[n] {
            n += 1;
        }
        if n > 0 {
            let mut out = b[..n].to_vec();
            let rest_a = a.get(n..).unwrap_or(&[]);
            out.extend(midpoint(rest_a, Some(&b[n..])));
            return out;
        }
    }

    let digit_a = a.first().and_then(|c| digit_value(*c)).unwrap_or(0);
    let digit_b = match b {
        Some(b) => b.first().and_then(|c| digit_value(*c)).unwrap_or(BASE),
        None => BASE,
    };

    if digit_b > digit_a + 1 {
        return vec![DIGITS[(digit_a + digit_b + 1) / 2]];
    }

    match b {
        Some(b) if b.len() > 1 => vec![b[0]],
        _ => {
            let mut out = vec![DIGITS[digit_a]];
            out.extend(midpoint(a.get(1..).unwrap_or(&[]), None));
            out
        }
    }
}

fn increment_integer(int: &str) -> Option<String> {
    let (head, digits) = int.as_bytes().split_first()?;
    let mut digits = digits.to_vec();
    let mut carry = true;
    for d in digits.iter_mut().rev() {
        let next = digit_value(*d)? + 1;
        if next == BASE {
            *d = ZERO;
        } else {
            *d = DIGITS[next];
            carry = false;
            break;
        }
    }
    if !carry {
        return Some(assemble(*head, &digits));
    }
    match *head {
        b'Z' => Some("a0".to_owned()),
        b'z' => None,
        h => {
            let next_head = h + 1;
            if next_head > b'a' {
                digits.push(ZERO);
            } else {
                digits.pop();
            }
            Some(assemble(next_head, &digits))
        }
    }
}

fn decrement_integer(int: &str) -> Option<String> {
    let (head, digits) = int.as_bytes().split_first()?;
    let mut digits = digits.to_vec();
    let max = DIGITS[BASE - 1];
    let mut borrow = true;
    for d in digits.iter_mut().rev() {
        let value = digit_value(*d)?;
        if value == 0 {
            *d = max;
        } else {
            *d = DIGITS[value - 1];
            borrow = false;
            break;
        }
    }
    if !borrow {
        return Some(assemble(*head, &digits));
    }
    match *head {
        b'a' => Some(assemble(b'Z', &[max])),
        b'A' => None,
        h => {
            let prev_head = h - 1;
            if prev_head < b'Z' {
                digits.push(max);
            } else {
                digits.pop();
            }
            Some(assemble(prev_head, &digits))
        }
    }
}

fn assemble(head: u8, digits: &[u8]) -> String {
    let mut out = String::with_capacity(digits.len() + 1);
    out.push(head as char);
    out.extend(digits.iter().map(|d| *d as char));
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
