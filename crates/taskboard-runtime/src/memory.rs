#![forbid(unsafe_code)]

//! In-memory subscription transport.
//!
//! [`MemoryTransport`] stands in for the real-time backend in tests and
//! demos: the caller decides exactly when a snapshot or an error is pushed,
//! which makes loading and reconciliation scenarios deterministic.
//!
//! Published snapshots are remembered per query; [`MemoryTransport::replay`]
//! re-sends the latest one, which is how a reconnecting backend behaves.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use taskboard_core::RawDocument;

use crate::transport::{
    ErrorCallback, QueryDescriptor, SnapshotCallback, SubscriptionHandle, SubscriptionTransport,
    TransportError,
};

struct Listener {
    id: u64,
    on_snapshot: Rc<SnapshotCallback>,
    on_error: Rc<ErrorCallback>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    listeners: HashMap<QueryDescriptor, Vec<Listener>>,
    latest: HashMap<QueryDescriptor, Vec<RawDocument>>,
    subscribe_count: u64,
}

/// A deterministic, single-threaded transport.
///
/// Cloning shares the same backing state.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Rc<RefCell<Inner>>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryTransport")
            .field("queries", &inner.listeners.len())
            .field("subscribe_count", &inner.subscribe_count)
            .finish()
    }
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a full snapshot to every listener of `query`.
    pub fn publish(&self, query: &QueryDescriptor, docs: Vec<RawDocument>) {
        let callbacks: Vec<Rc<SnapshotCallback>> = {
            let mut inner = self.inner.borrow_mut();
            inner.latest.insert(query.clone(), docs.clone());
            inner
                .listeners
                .get(query)
                .map(|ls| ls.iter().map(|l| Rc::clone(&l.on_snapshot)).collect())
                .unwrap_or_default()
        };
        for cb in callbacks {
            cb(docs.clone());
        }
    }

    /// Re-send the latest published snapshot of `query`, if any.
    pub fn replay(&self, query: &QueryDescriptor) {
        let docs = self.inner.borrow().latest.get(query).cloned();
        if let Some(docs) = docs {
            self.publish(query, docs);
        }
    }

    /// Fail every listener of `query`. Failed listeners are dropped.
    pub fn fail(&self, query: &QueryDescriptor, error: TransportError) {
        let callbacks: Vec<Rc<ErrorCallback>> = {
            let mut inner = self.inner.borrow_mut();
            inner
                .listeners
                .remove(query)
                .map(|ls| ls.into_iter().map(|l| l.on_error).collect())
                .unwrap_or_default()
        };
        for cb in callbacks {
            cb(error.clone());
        }
    }

    /// Live listeners for `query`.
    #[must_use]
    pub fn listener_count(&self, query: &QueryDescriptor) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(query)
            .map_or(0, Vec::len)
    }

    /// Live listeners across all queries.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.inner.borrow().listeners.values().map(Vec::len).sum()
    }

    /// Total `subscribe` calls ever made.
    #[must_use]
    pub fn subscribe_count(&self) -> u64 {
        self.inner.borrow().subscribe_count
    }
}

impl SubscriptionTransport for MemoryTransport {
    fn subscribe(
        &self,
        query: &QueryDescriptor,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> SubscriptionHandle {
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            inner.subscribe_count += 1;
            let id = inner.next_id;
            inner
                .listeners
                .entry(query.clone())
                .or_default()
                .push(Listener {
                    id,
                    on_snapshot: Rc::new(on_snapshot),
                    on_error: Rc::new(on_error),
                });
            id
        };

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        let query = query.clone();
        SubscriptionHandle::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut inner = inner.borrow_mut();
            if let Some(ls) = inner.listeners.get_mut(&query) {
                ls.retain(|l| l.id != id);
                if ls.is_empty() {
                    inner.listeners.remove(&query);
                }
            }
        })
    }
}
