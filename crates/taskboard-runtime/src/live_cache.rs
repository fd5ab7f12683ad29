#![forbid(unsafe_code)]

//! Live cache layer: one subscription-backed snapshot per collection.
//!
//! [`LiveCollection<T>`] owns the cached array for one query. Every
//! authoritative push **replaces** the whole array (snapshot semantics, no
//! merging). The reconciliation layer may request an optimistic write, which
//! always captures the prior snapshot so it can be restored.
//!
//! # Lifecycle
//!
//! ```text
//!            subscribe                first snapshot
//!   Idle ───────────────► Loading ───────────────────► Ready ◄─┐
//!    ▲                       │                          │  │   │ push / optimistic
//!    │ unsubscribe           │ transport or decode err  │  └───┘
//!    └───────────────────────┴──────────► Failed ◄──────┘
//! ```
//!
//! Unsubscribing clears the entry back to `Idle`, so a later subscription
//! for a different id never sees the previous id's data.
//!
//! # Invariants
//!
//! 1. Snapshots are immutable `Arc<Vec<T>>`; every write installs a new
//!    `Arc`, so "did the data change" is an identity check.
//! 2. `generation` strictly increases across writes of one collection.
//! 3. An optimistic snapshot records the generation of the authoritative
//!    snapshot it was derived from (`base`).
//! 4. Callbacks from a released subscription are ignored.
//! 5. `Failed` is terminal until the next `subscribe`.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use taskboard_core::{Decode, RawDocument, decode_all};
use tracing::{debug, error, info_span, warn};

use crate::error::SubscriptionError;
use crate::reactive::{Observable, ObserverGuard};
use crate::transport::{
    QueryDescriptor, SubscriptionHandle, SubscriptionTransport, TransportError,
};

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Pushed by the remote store.
    Authoritative,
    /// Written locally ahead of persistence.
    Optimistic,
}

/// One immutable version of a collection.
pub struct Snapshot<T> {
    items: Arc<Vec<T>>,
    generation: u64,
    base: u64,
    provenance: Provenance,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            generation: self.generation,
            base: self.base,
            provenance: self.provenance,
        }
    }
}

impl<T> PartialEq for Snapshot<T> {
    /// Identity, not content: two snapshots are equal only if they are the
    /// same write.
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("len", &self.items.len())
            .field("generation", &self.generation)
            .field("base", &self.base)
            .field("provenance", &self.provenance)
            .finish()
    }
}

impl<T> Snapshot<T> {
    #[must_use]
    pub fn items(&self) -> &Arc<Vec<T>> {
        &self.items
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation of the authoritative snapshot this one derives from.
    #[must_use]
    pub fn base(&self) -> u64 {
        self.base
    }

    #[must_use]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        self.provenance == Provenance::Optimistic
    }
}

/// Observable state of one collection.
#[derive(Debug)]
pub enum CollectionState<T> {
    /// No subscription.
    Idle,
    /// Subscribed, no snapshot delivered yet.
    Loading,
    Ready(Snapshot<T>),
    Failed(SubscriptionError),
}

impl<T> Clone for CollectionState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading => Self::Loading,
            Self::Ready(s) => Self::Ready(s.clone()),
            Self::Failed(e) => Self::Failed(e.clone()),
        }
    }
}

impl<T> PartialEq for CollectionState<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Idle, Self::Idle) | (Self::Loading, Self::Loading) => true,
            (Self::Ready(a), Self::Ready(b)) => a == b,
            (Self::Failed(a), Self::Failed(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> CollectionState<T> {
    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot<T>> {
        match self {
            Self::Ready(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn error(&self) -> Option<&SubscriptionError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Receipt for an optimistic write, used to restore the prior snapshot.
#[derive(Debug, Clone)]
pub struct OptimisticWrite<T> {
    previous: Snapshot<T>,
    generation: u64,
}

impl<T> OptimisticWrite<T> {
    /// The snapshot that was current immediately before the write.
    #[must_use]
    pub fn previous(&self) -> &Snapshot<T> {
        &self.previous
    }

    /// Generation of the optimistic snapshot the write installed.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of [`LiveCollection::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing happened since the write; the prior snapshot is back verbatim.
    Restored,
    /// Later optimistic writes were kept; only this write was reverted.
    Reverted,
    /// An authoritative snapshot replaced the write already; nothing to undo.
    Superseded,
}

struct Shared<T> {
    state: Observable<CollectionState<T>>,
    generation: Cell<u64>,
    /// Bumped on every (un)subscribe; stale callbacks compare against it.
    epoch: Cell<u64>,
}

impl<T: 'static> Shared<T> {
    fn next_generation(&self) -> u64 {
        let g = self.generation.get() + 1;
        self.generation.set(g);
        g
    }
}

/// Subscription-backed cache for one collection query.
pub struct LiveCollection<T> {
    shared: Rc<Shared<T>>,
    query: Option<QueryDescriptor>,
    handle: Option<SubscriptionHandle>,
}

impl<T> fmt::Debug for LiveCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCollection")
            .field("query", &self.query)
            .field("generation", &self.shared.generation.get())
            .finish_non_exhaustive()
    }
}

impl<T: Decode + Clone + 'static> Default for LiveCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Decode + Clone + 'static> LiveCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                state: Observable::new(CollectionState::Idle),
                generation: Cell::new(0),
                epoch: Cell::new(0),
            }),
            query: None,
            handle: None,
        }
    }

    /// Subscribe to `query`, replacing any existing subscription.
    ///
    /// Re-subscribing to the same query while not failed is a no-op.
    pub fn subscribe(&mut self, transport: &dyn SubscriptionTransport, query: QueryDescriptor) {
        let failed = self.shared.state.with(|s| matches!(s, CollectionState::Failed(_)));
        if self.query.as_ref() == Some(&query) && self.handle.is_some() && !failed {
            return;
        }
        self.unsubscribe();

        let epoch = self.shared.epoch.get() + 1;
        self.shared.epoch.set(epoch);
        self.shared.state.set(CollectionState::Loading);
        debug!(query = %query, "subscribing");

        let on_snapshot = {
            let shared = Rc::clone(&self.shared);
            let label = query.to_string();
            Box::new(move |docs: Vec<RawDocument>| {
                apply_snapshot(&shared, epoch, &label, &docs);
            })
        };
        let on_error = {
            let shared = Rc::clone(&self.shared);
            let label = query.to_string();
            Box::new(move |err: TransportError| {
                if shared.epoch.get() != epoch || is_failed(&shared) {
                    return;
                }
                error!(query = %label, error = %err, "subscription failed");
                shared
                    .state
                    .set(CollectionState::Failed(SubscriptionError::Transport {
                        query: label.clone(),
                        source: err,
                    }));
            })
        };

        let handle = transport.subscribe(&query, on_snapshot, on_error);
        self.query = Some(query);
        self.handle = Some(handle);
    }

    /// Release the subscription and clear the entry.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        if let Some(query) = self.query.take() {
            debug!(query = %query, "unsubscribed");
        }
        self.shared.epoch.set(self.shared.epoch.get() + 1);
        self.shared.state.set(CollectionState::Idle);
    }

    #[must_use]
    pub fn query(&self) -> Option<&QueryDescriptor> {
        self.query.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> CollectionState<T> {
        self.shared.state.get()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot<T>> {
        self.shared.state.with(|s| s.snapshot().cloned())
    }

    /// Current items, or an empty array when nothing has been delivered.
    #[must_use]
    pub fn items(&self) -> Arc<Vec<T>> {
        self.shared
            .state
            .with(|s| s.snapshot().map(|snap| Arc::clone(&snap.items)))
            .unwrap_or_default()
    }

    /// Whether at least one snapshot has arrived for the current subscription.
    #[must_use]
    pub fn has_delivered(&self) -> bool {
        self.shared.state.with(|s| s.snapshot().is_some())
    }

    /// Observe state changes (snapshot pushes, optimistic writes, failures).
    pub fn observe(&self, callback: impl Fn(&CollectionState<T>) + 'static) -> ObserverGuard {
        self.shared.state.subscribe(callback)
    }

    /// Number of state changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state.version()
    }

    /// Shared handle for optimistic writes that outlives this borrow.
    #[must_use]
    pub fn writer(&self) -> CollectionWriter<T> {
        CollectionWriter {
            shared: Rc::clone(&self.shared),
        }
    }

    /// See [`CollectionWriter::write_optimistic`].
    pub fn write_optimistic(&self, mutate: impl FnOnce(&mut Vec<T>)) -> Option<OptimisticWrite<T>> {
        self.writer().write_optimistic(mutate)
    }

    /// See [`CollectionWriter::restore`].
    pub fn restore(
        &self,
        write: &OptimisticWrite<T>,
        revert: impl FnOnce(&mut Vec<T>),
    ) -> RestoreOutcome {
        self.writer().restore(write, revert)
    }
}

/// Write access to a collection's cache entry.
///
/// Holds the entry, not the subscription: after the collection switches
/// query, writes land on whatever the entry holds now and restores of older
/// writes report [`RestoreOutcome::Superseded`].
pub struct CollectionWriter<T> {
    shared: Rc<Shared<T>>,
}

impl<T> Clone for CollectionWriter<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for CollectionWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionWriter")
            .field("generation", &self.shared.generation.get())
            .finish()
    }
}

impl<T: Clone + 'static> CollectionWriter<T> {
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot<T>> {
        self.shared.state.with(|s| s.snapshot().cloned())
    }

    /// Apply `mutate` to a copy of the current items and install the result
    /// as an optimistic snapshot.
    ///
    /// Returns `None` when the collection has no snapshot to write over.
    pub fn write_optimistic(&self, mutate: impl FnOnce(&mut Vec<T>)) -> Option<OptimisticWrite<T>> {
        let previous = self.snapshot()?;
        let mut items = previous.items.as_ref().clone();
        mutate(&mut items);
        let generation = self.shared.next_generation();
        self.shared.state.set(CollectionState::Ready(Snapshot {
            items: Arc::new(items),
            generation,
            base: previous.base,
            provenance: Provenance::Optimistic,
        }));
        debug!(generation, base = previous.base, "optimistic write");
        Some(OptimisticWrite {
            previous,
            generation,
        })
    }

    /// Undo an optimistic write.
    ///
    /// If the write is still the current snapshot, the captured snapshot is
    /// reinstalled as-is. If only later optimistic writes happened on top of
    /// it, `revert` is applied to a copy of the current items instead. If an
    /// authoritative snapshot has landed since, the write is already gone and
    /// nothing changes.
    pub fn restore(
        &self,
        write: &OptimisticWrite<T>,
        revert: impl FnOnce(&mut Vec<T>),
    ) -> RestoreOutcome {
        let Some(current) = self.snapshot() else {
            return RestoreOutcome::Superseded;
        };
        if current.generation == write.generation {
            self.shared
                .state
                .set(CollectionState::Ready(write.previous.clone()));
            return RestoreOutcome::Restored;
        }
        if current.is_optimistic() && current.base == write.previous.base {
            let mut items = current.items.as_ref().clone();
            revert(&mut items);
            let generation = self.shared.next_generation();
            self.shared.state.set(CollectionState::Ready(Snapshot {
                items: Arc::new(items),
                generation,
                base: current.base,
                provenance: Provenance::Optimistic,
            }));
            return RestoreOutcome::Reverted;
        }
        warn!(
            write_generation = write.generation,
            current_generation = current.generation,
            "rollback skipped: superseded by authoritative snapshot"
        );
        RestoreOutcome::Superseded
    }
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

fn is_failed<T: 'static>(shared: &Shared<T>) -> bool {
    shared
        .state
        .with(|s| matches!(s, CollectionState::Failed(_)))
}

fn apply_snapshot<T: Decode + Clone + 'static>(
    shared: &Shared<T>,
    epoch: u64,
    label: &str,
    docs: &[RawDocument],
) {
    if shared.epoch.get() != epoch {
        debug!(query = %label, "dropping snapshot from released subscription");
        return;
    }
    if is_failed(shared) {
        return;
    }
    let _span = info_span!("taskboard.snapshot", query = %label, docs = docs.len()).entered();
    match decode_all::<T>(docs) {
        Ok(items) => {
            let generation = shared.next_generation();
            shared.state.set(CollectionState::Ready(Snapshot {
                items: Arc::new(items),
                generation,
                base: generation,
                provenance: Provenance::Authoritative,
            }));
        }
        Err(err) => {
            error!(query = %label, document = err.document_id(), error = %err, "snapshot rejected");
            shared
                .state
                .set(CollectionState::Failed(SubscriptionError::Decode {
                    query: label.to_owned(),
                    source: Arc::new(err),
                }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use serde_json::json;
    use taskboard_core::{BoardId, TaskList};

    fn list_doc(id: &str, order: &str) -> RawDocument {
        RawDocument::new(id, json!({"boardId": "b1", "title": id, "order": order}))
    }

    fn setup() -> (MemoryTransport, QueryDescriptor, LiveCollection<TaskList>) {
        let transport = MemoryTransport::new();
        let query = QueryDescriptor::lists(&BoardId::new("b1"));
        let mut lists = LiveCollection::new();
        lists.subscribe(&transport, query.clone());
        (transport, query, lists)
    }

    #[test]
    fn subscribe_starts_loading() {
        let (transport, query, lists) = setup();
        assert!(lists.state().is_loading());
        assert_eq!(transport.listener_count(&query), 1);
        assert!(lists.items().is_empty());
    }

    #[test]
    fn push_replaces_whole_array() {
        let (transport, query, lists) = setup();
        transport.publish(&query, vec![list_doc("l1", "a0"), list_doc("l2", "a1")]);
        assert_eq!(lists.items().len(), 2);
        transport.publish(&query, vec![list_doc("l3", "a0")]);
        let items = lists.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "l3");
    }

    #[test]
    fn every_push_is_a_new_reference() {
        let (transport, query, lists) = setup();
        transport.publish(&query, vec![list_doc("l1", "a0")]);
        let first = lists.items();
        transport.publish(&query, vec![list_doc("l1", "a0")]);
        assert!(!Arc::ptr_eq(&first, &lists.items()));
    }

    #[test]
    fn unsubscribe_releases_and_clears() {
        let (transport, query, mut lists) = setup();
        transport.publish(&query, vec![list_doc("l1", "a0")]);
        lists.unsubscribe();
        assert_eq!(lists.state(), CollectionState::Idle);
        assert_eq!(transport.listener_count(&query), 0);
        assert!(lists.items().is_empty());
    }

    #[test]
    fn transport_error_is_terminal() {
        let (transport, query, lists) = setup();
        transport.fail(&query, TransportError::Disconnected);
        assert!(matches!(
            lists.state().error(),
            Some(SubscriptionError::Transport { .. })
        ));
        transport.publish(&query, vec![list_doc("l1", "a0")]);
        assert!(lists.state().error().is_some());
    }

    #[test]
    fn malformed_document_fails_collection() {
        let (transport, query, lists) = setup();
        transport.publish(
            &query,
            vec![list_doc("l1", "a0"), RawDocument::new("bad", json!(42))],
        );
        match lists.state() {
            CollectionState::Failed(SubscriptionError::Decode { source, .. }) => {
                assert_eq!(source.document_id(), "bad");
            }
            other => panic!("expected decode failure, got {other:?}"),
        }
    }

    #[test]
    fn resubscribe_after_failure_recovers() {
        let (transport, query, mut lists) = setup();
        transport.fail(&query, TransportError::Disconnected);
        lists.subscribe(&transport, query.clone());
        assert!(lists.state().is_loading());
        transport.publish(&query, vec![list_doc("l1", "a0")]);
        assert_eq!(lists.items().len(), 1);
    }

    #[test]
    fn optimistic_write_then_restore_is_reference_equal() {
        let (transport, query, lists) = setup();
        transport.publish(&query, vec![list_doc("l1", "a0"), list_doc("l2", "a1")]);
        let before = lists.snapshot().unwrap();
        let write = lists
            .write_optimistic(|items| items[0].title = "renamed".into())
            .unwrap();
        assert!(lists.snapshot().unwrap().is_optimistic());
        assert_eq!(lists.items()[0].title, "renamed");

        let outcome = lists.restore(&write, |_| unreachable!());
        assert_eq!(outcome, RestoreOutcome::Restored);
        let after = lists.snapshot().unwrap();
        assert_eq!(after, before);
        assert!(Arc::ptr_eq(after.items(), before.items()));
    }

    #[test]
    fn restore_under_later_write_reverts_only_target() {
        let (transport, query, lists) = setup();
        transport.publish(&query, vec![list_doc("l1", "a0"), list_doc("l2", "a1")]);
        let first = lists
            .write_optimistic(|items| items[0].title = "one".into())
            .unwrap();
        lists.write_optimistic(|items| items[1].title = "two".into());

        let outcome = lists.restore(&first, |items| items[0].title = "l1".into());
        assert_eq!(outcome, RestoreOutcome::Reverted);
        let items = lists.items();
        assert_eq!(items[0].title, "l1");
        assert_eq!(items[1].title, "two");
    }

    #[test]
    fn restore_after_authoritative_push_is_skipped() {
        let (transport, query, lists) = setup();
        transport.publish(&query, vec![list_doc("l1", "a0")]);
        let write = lists
            .write_optimistic(|items| items[0].title = "mine".into())
            .unwrap();
        transport.publish(&query, vec![list_doc("l1", "a5")]);
        let pushed = lists.snapshot().unwrap();

        assert_eq!(lists.restore(&write, |_| {}), RestoreOutcome::Superseded);
        assert_eq!(lists.snapshot().unwrap(), pushed);
    }

    #[test]
    fn write_without_snapshot_is_refused() {
        let (_transport, _query, lists) = setup();
        assert!(lists.write_optimistic(|_| {}).is_none());
    }

    #[test]
    fn observers_see_each_transition() {
        let (transport, query, lists) = setup();
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _guard = lists.observe(move |state| {
            log.borrow_mut().push(match state {
                CollectionState::Idle => "idle",
                CollectionState::Loading => "loading",
                CollectionState::Ready(_) => "ready",
                CollectionState::Failed(_) => "failed",
            });
        });
        transport.publish(&query, vec![list_doc("l1", "a0")]);
        transport.publish(&query, vec![]);
        assert_eq!(*seen.borrow(), vec!["ready", "ready"]);
    }
}
