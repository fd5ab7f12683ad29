#![forbid(unsafe_code)]

//! Optimistic override maps.
//!
//! An override is a local guess layered over the cached data until the
//! remote store speaks again. The reconciliation point is identity: when a
//! [`SnapshotWatch`] sees a snapshot `Arc` it has not seen before, every
//! override derived from the old data is discarded wholesale, confirmed or
//! not.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Id → pending value.
#[derive(Debug, Clone)]
pub struct OverrideMap<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for OverrideMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> OverrideMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the override for `id`, returning the one it replaced.
    pub fn insert(&mut self, id: K, value: V) -> Option<V> {
        self.entries.insert(id, value)
    }

    #[must_use]
    pub fn get(&self, id: &K) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &K) -> Option<V> {
        self.entries.remove(id)
    }

    /// Put back a previously captured entry (`None` removes).
    pub fn restore(&mut self, id: K, previous: Option<V>) {
        match previous {
            Some(value) => {
                self.entries.insert(id, value);
            }
            None => {
                self.entries.remove(&id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

/// Detects a new snapshot by `Arc` identity.
///
/// Holding the last seen `Arc` keeps its allocation alive, so a later
/// snapshot can never reuse its address and be mistaken for it.
#[derive(Debug)]
pub struct SnapshotWatch<T> {
    last: Option<Arc<Vec<T>>>,
    changes: u64,
}

impl<T> Default for SnapshotWatch<T> {
    fn default() -> Self {
        Self {
            last: None,
            changes: 0,
        }
    }
}

impl<T> SnapshotWatch<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `items`; `true` if it differs by reference from the last one.
    pub fn observe(&mut self, items: &Arc<Vec<T>>) -> bool {
        if self.last.as_ref().is_some_and(|last| Arc::ptr_eq(last, items)) {
            return false;
        }
        self.last = Some(Arc::clone(items));
        self.changes += 1;
        true
    }

    /// Number of identity changes observed so far.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_none_removes() {
        let mut map = OverrideMap::new();
        let replaced = map.insert("t1", 5);
        assert_eq!(replaced, None);
        map.restore("t1", None);
        assert!(map.is_empty());
        map.restore("t1", Some(3));
        assert_eq!(map.get(&"t1"), Some(&3));
    }

    #[test]
    fn watch_compares_identity_not_content() {
        let mut watch = SnapshotWatch::new();
        let a = Arc::new(vec![1, 2]);
        assert!(watch.observe(&a));
        assert!(!watch.observe(&Arc::clone(&a)));
        let same_content = Arc::new(vec![1, 2]);
        assert!(watch.observe(&same_content));
        assert_eq!(watch.changes(), 2);
    }
}
