#![forbid(unsafe_code)]

//! Taskboard Runtime
//!
//! Live data for the taskboard: subscription-backed collection caches and the
//! views built from them.
//!
//! # Key Components
//!
//! - [`LiveCollection`] - One query's cached snapshot, with optimistic writes
//! - [`BoardView`] - Board, lists and tasks for the open board
//! - [`BoardDirectory`] - Owned and shared boards of a user
//! - [`LabelsAndSprints`] - Board-scoped labels and sprints
//! - [`SubscriptionTransport`] - Seam to the real-time backend
//! - [`MemoryTransport`] - Deterministic in-process transport
//! - [`Observable`] - Change notification for host views
//!
//! # Role in the taskboard workspace
//! `taskboard-runtime` sits between `taskboard-core` (pure types) and
//! `taskboard-reconcile` (gesture handling). It owns every cached snapshot;
//! the reconciliation layer only requests optimistic writes through
//! [`LiveCollection::write_optimistic`] and undoes them with
//! [`LiveCollection::restore`].

pub mod board_view;
pub mod directory;
pub mod error;
pub mod live_cache;
pub mod memory;
pub mod reactive;
pub mod taxonomy;
pub mod transport;

pub use board_view::{BoardStatus, BoardView};
pub use directory::BoardDirectory;
pub use error::SubscriptionError;
pub use live_cache::{
    CollectionState, CollectionWriter, LiveCollection, OptimisticWrite, Provenance, RestoreOutcome,
    Snapshot,
};
pub use memory::MemoryTransport;
pub use reactive::{Observable, ObserverGuard};
pub use taxonomy::LabelsAndSprints;
pub use transport::{
    CollectionKind, ErrorCallback, QueryDescriptor, QueryFilter, SnapshotCallback,
    SubscriptionHandle, SubscriptionTransport, TransportError,
};
