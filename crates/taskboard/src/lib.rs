#![forbid(unsafe_code)]

//! Taskboard sync core public facade.
//!
//! This crate provides the surface a host application links against. It
//! re-exports the common types from the internal crates, bundles a board's
//! views and reconcilers into a [`BoardSession`], and offers a prelude.

pub mod session;
#[cfg(feature = "tracing-json")]
pub mod telemetry;

use thiserror::Error;

// --- Core re-exports -------------------------------------------------------

pub use taskboard_core::{
    Board, BoardId, BoardSummary, DragId, DragKind, DropTarget, GestureEnd, GestureOver,
    GestureStart, Label, LabelId, ListId, MoveProjector, OrderKey, RawDocument, ResizeEdge,
    ResizeProjector, Span, SpanProjection, Sprint, SprintId, Task, TaskId, TaskList,
    TimelineDragEnd, TimelineResizeEnd, UserId, key_at_end, key_at_index, key_between,
    sort_by_order, validate_key,
};

// --- Runtime re-exports ----------------------------------------------------

pub use taskboard_runtime::{
    BoardDirectory, BoardStatus, BoardView, CollectionKind, CollectionState, LabelsAndSprints,
    LiveCollection, MemoryTransport, QueryDescriptor, SubscriptionHandle, SubscriptionTransport,
};

// --- Reconcile re-exports --------------------------------------------------

pub use taskboard_reconcile::{
    Coordinator, DateHeader, DateRange, PersistCommand, PersistRequest, RangeExpander,
    RemotePersistence, ScrollMetrics, SyncConfig, Ticket, TimelineProjection,
    TimelineReconciler, Viewport,
};

pub use session::{BoardSession, Origin, SessionCommand};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for taskboard hosts.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    OrderKey(#[from] taskboard_core::OrderKeyError),

    #[error(transparent)]
    Decode(#[from] taskboard_core::DecodeError),

    #[error(transparent)]
    Subscription(#[from] taskboard_runtime::SubscriptionError),

    #[error(transparent)]
    Reconcile(#[from] taskboard_reconcile::ReconcileError),

    #[error(transparent)]
    Persist(#[from] taskboard_reconcile::PersistError),

    #[error(transparent)]
    Config(#[from] taskboard_reconcile::ConfigError),

    #[cfg(feature = "tracing-json")]
    #[error("tracing subscriber already installed: {0}")]
    Telemetry(#[from] tracing_subscriber::util::TryInitError),
}

/// Standard result type for taskboard APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        BoardId, BoardSession, BoardStatus, DragId, DragKind, DropTarget, Error, GestureEnd,
        GestureOver, GestureStart, ListId, Origin, PersistCommand, RemotePersistence, Result,
        SessionCommand, Span, SyncConfig, Task, TaskId, TaskList,
    };

    pub use crate::{core, reconcile, runtime};
}

pub use taskboard_core as core;
pub use taskboard_reconcile as reconcile;
pub use taskboard_runtime as runtime;
