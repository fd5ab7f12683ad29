#![forbid(unsafe_code)]

//! Reconciliation: optimistic writes, persistence commands, and rollback.
//!
//! # Role in the taskboard workspace
//! `taskboard-reconcile` turns finished gestures into optimistic cache
//! writes plus a [`PersistCommand`] for the host to execute. The host
//! reports each outcome back through `complete(ticket, result)`; a
//! rejection rolls the optimistic state back and is returned as a
//! [`ReconcileError`].
//!
//! # Primary responsibilities
//! - **coordinator**: drag state and the board's item/group drop paths.
//! - **timeline**: span and row overrides, remount tokens, the virtualized
//!   date header, and boundless range expansion.
//! - **persistence**: tickets, in-flight tracking, and the remote write API.
//! - **rollback** / **overrides**: bookkeeping shared by both reconcilers.
//! - **config**: tunables, loadable from TOML/JSON with the `config` feature.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod overrides;
pub mod persistence;
pub mod rollback;
pub mod timeline;

pub use config::{CacheConfig, ConfigError, SyncConfig, TimelineConfig};
pub use coordinator::{Approach, Coordinator, DragState, Placement, Reorderable, plan_placement};
pub use error::{PersistError, ReconcileError};
pub use overrides::{OverrideMap, SnapshotWatch};
pub use persistence::{PersistCommand, PersistRequest, RemotePersistence, SyncStatus, Ticket};
pub use rollback::RollbackLog;
pub use timeline::{
    DateHeader, DateRange, ExpandDirection, Expansion, HeaderDay, HeaderWindow, RangeExpander,
    ScrollMetrics, TimelineItem, TimelineProjection, TimelineReconciler, TimelineRow, Viewport,
};
