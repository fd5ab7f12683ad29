#![forbid(unsafe_code)]

//! Discrete drag reconciliation.
//!
//! [`Coordinator`] turns a finished drag into an optimistic cache write plus
//! a [`PersistCommand`], and rolls the write back if the host reports that
//! the command failed.
//!
//! # State Machine
//!
//! ```text
//!          handle_gesture_start            handle_gesture_end
//!   Idle ───────────────────────► Dragging ─────────────────► Idle
//!                                  │    ▲
//!                                  └────┘ handle_gesture_over
//! ```
//!
//! The end transition happens synchronously, before any persistence work,
//! and regardless of its outcome.
//!
//! # Placement
//!
//! Dropping on a sibling inherits the sibling's scope. Dropping on a
//! container targets that scope at position 0. Within one scope the
//! [`Approach`] decides the side: an item travelling toward higher indices
//! lands after the hovered sibling, otherwise before it. Cross-scope drops
//! always land before the hovered sibling.
//!
//! # Invariants
//!
//! 1. A drop with no target, or onto itself, changes nothing.
//! 2. The optimistic write is visible in the cache before the command is
//!    returned.
//! 3. Each ticket is completed at most once; a rejection restores the
//!    pre-write snapshot (or reverts just this write if newer writes exist).

use std::fmt;

use taskboard_core::{
    Decode, DragId, DragKind, DropTarget, GestureEnd, GestureOver, GestureStart, Label, OrderKey,
    Scoped, Sprint, Task, TaskList, compare_order, key_at_index, sort_by_order,
};
use taskboard_runtime::{
    BoardView, CollectionKind, CollectionWriter, LiveCollection, OptimisticWrite, RestoreOutcome,
};
use tracing::{debug, info_span, trace, warn};

use crate::config::CacheConfig;
use crate::error::{PersistError, ReconcileError};
use crate::persistence::{PersistCommand, PersistRequest, SyncStatus, Ticket};
use crate::rollback::RollbackLog;

/// A cached entity the coordinator can reposition.
pub trait Reorderable:
    Scoped<Id: AsRef<str>, Scope: AsRef<str> + for<'a> From<&'a str>> + Decode + Clone + 'static
{
    const COLLECTION: CollectionKind;
}

impl Reorderable for Task {
    const COLLECTION: CollectionKind = CollectionKind::Tasks;
}

impl Reorderable for TaskList {
    const COLLECTION: CollectionKind = CollectionKind::Lists;
}

impl Reorderable for Label {
    const COLLECTION: CollectionKind = CollectionKind::Labels;
}

impl Reorderable for Sprint {
    const COLLECTION: CollectionKind = CollectionKind::Sprints;
}

/// Direction the dragged entity travelled within its own scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    /// From a lower index (above on screen) toward a higher one.
    FromAbove,
    /// From a higher index (below on screen), or from another scope.
    FromBelow,
}

impl Approach {
    /// Travel from `active_index` to `over_index` in pre-move sorted order.
    #[must_use]
    pub const fn between(active_index: usize, over_index: usize) -> Self {
        if active_index < over_index {
            Self::FromAbove
        } else {
            Self::FromBelow
        }
    }
}

/// Where a dropped entity goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement<S> {
    pub scope: S,
    /// Insertion index among the scope's ordered siblings, mover excluded.
    pub index: usize,
    pub key: OrderKey,
    /// `None` for container drops and unordered targets.
    pub approach: Option<Approach>,
}

/// Compute scope, index and key for dropping `active` on `target`.
pub fn plan_placement<T: Reorderable>(
    items: &[T],
    active: &str,
    target: &DropTarget,
) -> Result<Placement<T::Scope>, ReconcileError> {
    let moved = find(items, active).ok_or(ReconcileError::ValidationImpossible)?;
    let (scope, hovered) = match target {
        DropTarget::Item(id) => {
            if id.as_str() == active {
                return Err(ReconcileError::ValidationImpossible);
            }
            let sibling = find(items, id.as_str()).ok_or(ReconcileError::ValidationImpossible)?;
            (sibling.scope().clone(), Some(sibling))
        }
        DropTarget::Container(id) => (T::Scope::from(id.as_str()), None),
    };

    let mut siblings: Vec<T> = items
        .iter()
        .filter(|i| i.scope() == &scope && i.id() != moved.id() && i.order().is_some())
        .cloned()
        .collect();
    sort_by_order(&mut siblings);

    let (index, approach) = match hovered {
        None => (0, None),
        Some(over) => match siblings.iter().position(|s| s.id() == over.id()) {
            // Unordered siblings render last; anything ordered goes before them.
            None => (siblings.len(), None),
            Some(pos) => {
                let approach = if moved.scope() == &scope {
                    scope_approach(items, &scope, moved, over)
                } else {
                    Approach::FromBelow
                };
                let index = match approach {
                    Approach::FromAbove => pos + 1,
                    Approach::FromBelow => pos,
                };
                (index, Some(approach))
            }
        },
    };

    Ok(Placement {
        key: key_at_index(&siblings, index),
        scope,
        index,
        approach,
    })
}

fn find<'a, T: Reorderable>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|i| i.id().as_ref() == id)
}

fn scope_approach<T: Reorderable>(items: &[T], scope: &T::Scope, moved: &T, over: &T) -> Approach {
    let mut in_scope: Vec<&T> = items.iter().filter(|i| i.scope() == scope).collect();
    in_scope.sort_by(|a, b| {
        compare_order(
            a.order().map(OrderKey::as_str),
            b.order().map(OrderKey::as_str),
        )
    });
    let index_of = |target: &T| in_scope.iter().position(|i| i.id() == target.id());
    match (index_of(moved), index_of(over)) {
        (Some(a), Some(o)) => Approach::between(a, o),
        _ => Approach::FromBelow,
    }
}

/// Drag state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        active_id: DragId,
        active_kind: DragKind,
        over_id: Option<DragId>,
    },
}

struct PendingRollback {
    entity: String,
    restore: Box<dyn FnOnce() -> RestoreOutcome>,
}

/// Drag/drop reconciliation for lists, tasks, labels and sprints.
pub struct Coordinator {
    drag: DragState,
    rollbacks: RollbackLog<PendingRollback>,
    sync: SyncStatus,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("drag", &self.drag)
            .field("in_flight", &self.sync.in_flight())
            .field("rollbacks", &self.rollbacks)
            .finish()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl Coordinator {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            drag: DragState::Idle,
            rollbacks: RollbackLog::new(config.rollback_depth),
            sync: SyncStatus::new(),
        }
    }

    // ====================================================================
    // Gesture callbacks
    // ====================================================================

    pub fn handle_gesture_start(&mut self, start: GestureStart) {
        if let DragState::Dragging { active_id, .. } = &self.drag {
            trace!(previous = %active_id, "drag restarted without end");
        }
        self.drag = DragState::Dragging {
            active_id: start.id,
            active_kind: start.kind,
            over_id: None,
        };
    }

    /// Track the hovered element. No side effects beyond the state.
    pub fn handle_gesture_over(&mut self, over: GestureOver) {
        if let DragState::Dragging { over_id, .. } = &mut self.drag {
            *over_id = over.over;
        }
    }

    /// Abandon the current drag with no side effects.
    pub fn cancel(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Finish a kanban drag: tasks move between lists, lists reorder.
    pub fn handle_gesture_end(
        &mut self,
        end: GestureEnd,
        board: &BoardView,
    ) -> Option<PersistCommand> {
        let kind = self.finish_drag(&end)?;
        let _span =
            info_span!("taskboard.gesture_end", active = %end.active, kind = ?kind).entered();
        let result = match kind {
            DragKind::Item => {
                if let Some(DropTarget::Container(id)) = &end.over {
                    let known = board.lists().iter().any(|l| l.id.as_str() == id.as_str());
                    if !known {
                        return ignore(&end, ReconcileError::ValidationImpossible);
                    }
                }
                self.move_item(&end, board.tasks_collection())
            }
            DragKind::Group => self.reorder_group(&end, board.lists_collection()),
        };
        settle(&end, result)
    }

    /// Finish a group drag over any board-scoped collection (labels, sprints).
    pub fn handle_group_end<T: Reorderable>(
        &mut self,
        end: GestureEnd,
        groups: &LiveCollection<T>,
    ) -> Option<PersistCommand> {
        let kind = self.finish_drag(&end)?;
        let _span =
            info_span!("taskboard.gesture_end", active = %end.active, kind = ?kind).entered();
        if kind != DragKind::Group {
            return ignore(&end, ReconcileError::ValidationImpossible);
        }
        let result = self.reorder_group(&end, groups);
        settle(&end, result)
    }

    // ====================================================================
    // Moves
    // ====================================================================

    /// Move an entity to a new scope and position.
    pub fn move_item<T: Reorderable>(
        &mut self,
        end: &GestureEnd,
        items: &LiveCollection<T>,
    ) -> Result<PersistCommand, ReconcileError> {
        let target = end.over.as_ref().ok_or(ReconcileError::ValidationImpossible)?;
        let current = items.items();
        let placement = plan_placement(&current, end.active.as_str(), target)?;
        let original = find(&current, end.active.as_str())
            .cloned()
            .ok_or(ReconcileError::ValidationImpossible)?;

        let writer = items.writer();
        let write = {
            let id = original.id().clone();
            let scope = placement.scope.clone();
            let key = placement.key.clone();
            writer.write_optimistic(move |items| {
                if let Some(item) = items.iter_mut().find(|i| i.id() == &id) {
                    item.set_scope(scope);
                    item.set_order(key);
                }
            })
        }
        .ok_or(ReconcileError::ValidationImpossible)?;

        debug!(
            entity = original.id().as_ref(),
            scope = placement.scope.as_ref(),
            key = %placement.key,
            index = placement.index,
            approach = ?placement.approach,
            "optimistic move"
        );
        let request = PersistRequest::MovePosition {
            collection: T::COLLECTION,
            id: original.id().as_ref().to_owned(),
            scope: placement.scope.as_ref().to_owned(),
            key: placement.key,
        };
        Ok(self.issue(original, writer, write, request))
    }

    /// Reorder a group within its board; the scope never changes.
    pub fn reorder_group<T: Reorderable>(
        &mut self,
        end: &GestureEnd,
        groups: &LiveCollection<T>,
    ) -> Result<PersistCommand, ReconcileError> {
        let Some(target) = end
            .over
            .as_ref()
            .filter(|t| matches!(t, DropTarget::Item(_)))
        else {
            return Err(ReconcileError::ValidationImpossible);
        };
        let current = groups.items();
        let placement = plan_placement(&current, end.active.as_str(), target)?;
        let original = find(&current, end.active.as_str())
            .cloned()
            .ok_or(ReconcileError::ValidationImpossible)?;
        if &placement.scope != original.scope() {
            return Err(ReconcileError::ValidationImpossible);
        }

        let writer = groups.writer();
        let write = {
            let id = original.id().clone();
            let key = placement.key.clone();
            writer.write_optimistic(move |items| {
                if let Some(group) = items.iter_mut().find(|i| i.id() == &id) {
                    group.set_order(key);
                }
            })
        }
        .ok_or(ReconcileError::ValidationImpossible)?;

        debug!(
            entity = original.id().as_ref(),
            key = %placement.key,
            index = placement.index,
            "optimistic group reorder"
        );
        let request = PersistRequest::ReorderGroup {
            collection: T::COLLECTION,
            id: original.id().as_ref().to_owned(),
            key: placement.key,
        };
        Ok(self.issue(original, writer, write, request))
    }

    fn issue<T: Reorderable>(
        &mut self,
        original: T,
        writer: CollectionWriter<T>,
        write: OptimisticWrite<T>,
        request: PersistRequest,
    ) -> PersistCommand {
        let ticket = self.sync.begin();
        let entity = original.id().as_ref().to_owned();
        let restore = Box::new(move || {
            let id = original.id().clone();
            writer.restore(&write, move |items| {
                if let Some(slot) = items.iter_mut().find(|i| i.id() == &id) {
                    *slot = original;
                }
            })
        });
        self.rollbacks.push(ticket, PendingRollback { entity, restore });
        PersistCommand {
            ticket,
            requests: vec![request],
        }
    }

    // ====================================================================
    // Completion
    // ====================================================================

    /// Report the outcome of executing the command issued with `ticket`.
    ///
    /// A failure rolls the optimistic write back and is returned for the
    /// host to surface. Nothing is retried.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<(), PersistError>,
    ) -> Result<(), ReconcileError> {
        let was_pending = self.sync.finish(ticket);
        let record = self.rollbacks.take(ticket);
        match (result, record) {
            (Ok(()), _) => {
                if !was_pending {
                    debug!(ticket = %ticket, "completion for unknown ticket");
                }
                Ok(())
            }
            (Err(source), Some(record)) => {
                let outcome = (record.restore)();
                warn!(
                    ticket = %ticket,
                    entity = %record.entity,
                    outcome = ?outcome,
                    error = %source,
                    "persistence rejected; rolled back"
                );
                Err(ReconcileError::PersistenceRejected {
                    id: record.entity,
                    source,
                })
            }
            (Err(source), None) => {
                warn!(
                    ticket = %ticket,
                    error = %source,
                    "persistence rejected; no rollback record"
                );
                Err(ReconcileError::RollbackUnavailable { ticket, source })
            }
        }
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&DragId> {
        match &self.drag {
            DragState::Dragging { active_id, .. } => Some(active_id),
            DragState::Idle => None,
        }
    }

    #[must_use]
    pub fn active_kind(&self) -> Option<DragKind> {
        match &self.drag {
            DragState::Dragging { active_kind, .. } => Some(*active_kind),
            DragState::Idle => None,
        }
    }

    #[must_use]
    pub fn over_id(&self) -> Option<&DragId> {
        match &self.drag {
            DragState::Dragging { over_id, .. } => over_id.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Whether any issued command is still awaiting completion.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.sync.in_flight()
    }

    /// Dragging → Idle; returns the drag kind if `end` matches the drag.
    fn finish_drag(&mut self, end: &GestureEnd) -> Option<DragKind> {
        match std::mem::take(&mut self.drag) {
            DragState::Dragging {
                active_id,
                active_kind,
                ..
            } if active_id == end.active => Some(active_kind),
            DragState::Dragging { active_id, .. } => {
                trace!(started = %active_id, ended = %end.active, "gesture end for another drag");
                None
            }
            DragState::Idle => {
                trace!(ended = %end.active, "gesture end without start");
                None
            }
        }
    }
}

fn settle(
    end: &GestureEnd,
    result: Result<PersistCommand, ReconcileError>,
) -> Option<PersistCommand> {
    match result {
        Ok(command) => Some(command),
        Err(err) => ignore(end, err),
    }
}

fn ignore(end: &GestureEnd, err: ReconcileError) -> Option<PersistCommand> {
    trace!(active = %end.active, reason = %err, "gesture ignored");
    None
}
