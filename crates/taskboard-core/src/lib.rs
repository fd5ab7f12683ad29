#![forbid(unsafe_code)]

//! Core: order keys, domain model, decode boundary, and gesture events.
//!
//! # Role in the taskboard workspace
//! `taskboard-core` is the leaf layer. It is pure: no I/O, no shared state,
//! no logging. Everything above it (`taskboard-runtime` for live data,
//! `taskboard-reconcile` for optimistic writes) builds on these types.
//!
//! # Primary responsibilities
//! - **order_key**: fractional keys that allow insertion anywhere without
//!   renumbering siblings.
//! - **model**: boards, lists, tasks, labels, sprints, and the
//!   [`Ordered`]/[`Scoped`] traits that describe sibling scopes.
//! - **decode**: typed decoding of remote documents.
//! - **gesture**: drag/drop and timeline gesture events.

pub mod decode;
pub mod error;
pub mod gesture;
pub mod model;
pub mod order_key;

pub use decode::{Decode, RawDocument, decode_all};
pub use error::{DecodeError, OrderKeyError};
pub use gesture::{
    DragId, DragKind, DropTarget, GestureEnd, GestureOver, GestureStart, MoveProjector,
    ResizeEdge, ResizeProjector, SpanProjection, TimelineDragEnd, TimelineResizeEnd,
};
pub use model::{
    Board, BoardId, BoardSummary, Label, LabelId, ListId, MS_PER_DAY, OrderKey, Ordered, Scoped,
    Span, Sprint, SprintId, Task, TaskId, TaskList, Timestamp, UserId,
};
pub use order_key::{
    compare_order, key_at_end, key_at_index, key_between, sort_by_order, validate_key,
};
