#![forbid(unsafe_code)]

//! Gesture events delivered by the host's drag-and-drop system.
//!
//! The host's pointer layer owns hit-testing; by the time an event reaches
//! the reconciliation layer it names entities, not coordinates.
//!
//! # Sequences
//!
//! A well-formed discrete drag is `GestureStart` → zero or more
//! `GestureOver` → `GestureEnd`. A `GestureEnd` without a drop target is a
//! cancelled drag.
//!
//! Timeline gestures carry a [`SpanProjection`]: an opaque callable that maps
//! the item's span at drag start to the candidate span for the current
//! pointer state.

use std::fmt;

use crate::model::{ListId, MS_PER_DAY, Span, TaskId};

/// What is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragKind {
    /// A task card, which moves between scopes.
    Item,
    /// A group (list, label, sprint), reordered within its board.
    Group,
}

/// Id of a draggable or droppable element, as registered with the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DragId(String);

impl DragId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DragId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DragId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<&TaskId> for DragId {
    fn from(id: &TaskId) -> Self {
        Self(id.as_str().to_owned())
    }
}

impl From<&ListId> for DragId {
    fn from(id: &ListId) -> Self {
        Self(id.as_str().to_owned())
    }
}

/// Where a dragged element was released.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Over a sibling element; the drop inherits that sibling's scope.
    Item(DragId),
    /// Over a scope container (e.g. an empty list body).
    Container(DragId),
}

impl DropTarget {
    #[must_use]
    pub fn id(&self) -> &DragId {
        match self {
            Self::Item(id) | Self::Container(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureStart {
    pub id: DragId,
    pub kind: DragKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureOver {
    pub over: Option<DragId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureEnd {
    pub active: DragId,
    pub over: Option<DropTarget>,
}

// ---------------------------------------------------------------------------
// Timeline gestures
// ---------------------------------------------------------------------------

/// Maps the span an item had at gesture start to its candidate span.
pub trait SpanProjection {
    fn project(&self, original: Span) -> Span;
}

impl<F> SpanProjection for F
where
    F: Fn(Span) -> Span,
{
    fn project(&self, original: Span) -> Span {
        self(original)
    }
}

/// Which edge of a span a resize drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Start,
    End,
}

/// Horizontal move by a fixed delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveProjector {
    pub delta_ms: i64,
}

impl MoveProjector {
    /// Build from a pointer delta in pixels, snapped to whole days.
    #[must_use]
    pub fn from_pixels(dx: f64, px_per_day: f64) -> Self {
        Self {
            delta_ms: snap_to_days(dx, px_per_day),
        }
    }
}

impl SpanProjection for MoveProjector {
    fn project(&self, original: Span) -> Span {
        original.shifted(self.delta_ms)
    }
}

/// Edge drag that never shrinks a span below `min_duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeProjector {
    pub edge: ResizeEdge,
    pub delta_ms: i64,
    pub min_duration_ms: i64,
}

impl ResizeProjector {
    /// Build from a pointer delta in pixels, snapped to whole days, with a
    /// one-day minimum duration.
    #[must_use]
    pub fn from_pixels(edge: ResizeEdge, dx: f64, px_per_day: f64) -> Self {
        Self {
            edge,
            delta_ms: snap_to_days(dx, px_per_day),
            min_duration_ms: MS_PER_DAY,
        }
    }
}

impl SpanProjection for ResizeProjector {
    fn project(&self, original: Span) -> Span {
        let min = self.min_duration_ms.max(0);
        match self.edge {
            ResizeEdge::Start => {
                let start = original.start.saturating_add(self.delta_ms);
                Span {
                    start: start.min(original.end.saturating_sub(min)),
                    end: original.end,
                }
            }
            ResizeEdge::End => {
                let end = original.end.saturating_add(self.delta_ms);
                Span {
                    start: original.start,
                    end: end.max(original.start.saturating_add(min)),
                }
            }
        }
    }
}

fn snap_to_days(dx: f64, px_per_day: f64) -> i64 {
    if !dx.is_finite() || !px_per_day.is_finite() || px_per_day <= 0.0 {
        return 0;
    }
    ((dx / px_per_day).round() as i64).saturating_mul(MS_PER_DAY)
}

/// End of a timeline move (time and/or row).
pub struct TimelineDragEnd<'a> {
    pub id: TaskId,
    /// Row under the pointer, if the drop landed on one.
    pub over_row: Option<ListId>,
    pub projector: &'a dyn SpanProjection,
}

impl fmt::Debug for TimelineDragEnd<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineDragEnd")
            .field("id", &self.id)
            .field("over_row", &self.over_row)
            .finish_non_exhaustive()
    }
}

/// End of a timeline edge resize.
pub struct TimelineResizeEnd<'a> {
    pub id: TaskId,
    pub projector: &'a dyn SpanProjection,
}

impl fmt::Debug for TimelineResizeEnd<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineResizeEnd")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
