#![forbid(unsafe_code)]

//! Span and row reconciliation for the timeline.
//!
//! Timeline gestures do not write into the task cache. The reconciler keeps
//! two override maps on top of it instead: one for spans, one for rows.
//! [`TimelineReconciler::project`] merges them into the cached tasks each
//! frame.
//!
//! Both maps are discarded together as soon as an authoritative task list
//! with a new identity arrives. At that point the remote store has either
//! confirmed the writes (the data now carries them) or moved on, and in
//! both cases the overrides only describe stale data.
//!
//! # Remount tokens
//!
//! A resize ends on the same item it started on, with the same id and often
//! the same span after snapping. Renderers that key their widgets on id
//! keep the stale drag geometry. Every resize therefore bumps the item's
//! [`TimelineItem::remount`] token by one, which changes its render key.
//! Tokens survive new snapshots for as long as the task is in them; a task
//! that leaves the authoritative list (deleted, or a different board was
//! opened) loses its token.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use taskboard_core::{
    ListId, OrderKey, Span, Task, TaskId, TaskList, TimelineDragEnd, TimelineResizeEnd,
    compare_order, key_at_end, sort_by_order,
};
use taskboard_runtime::{CollectionKind, Snapshot};
use tracing::{debug, info_span, trace, warn};

use crate::config::CacheConfig;
use crate::error::{PersistError, ReconcileError};
use crate::overrides::{OverrideMap, SnapshotWatch};
use crate::persistence::{PersistCommand, PersistRequest, SyncStatus, Ticket};
use crate::rollback::RollbackLog;

/// One bar on the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineItem {
    pub id: TaskId,
    pub row_id: ListId,
    pub title: String,
    pub span: Span,
    /// Bumped on every resize.
    pub remount: u32,
}

impl TimelineItem {
    /// Key that changes whenever the item must be rebuilt from scratch.
    #[must_use]
    pub fn render_key(&self) -> String {
        format!("{}#{}", self.id, self.remount)
    }
}

/// One swimlane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub id: ListId,
    pub title: String,
}

/// Everything the timeline renders for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineProjection {
    /// Lists in key order.
    pub rows: Vec<TimelineRow>,
    /// Dated tasks, grouped by row in row order, then by start.
    pub items: Vec<TimelineItem>,
    /// Tasks left out because they lack a start or due date.
    pub hidden_count: usize,
}

impl TimelineProjection {
    /// Items placed in `row`.
    pub fn items_in<'a>(&'a self, row: &'a ListId) -> impl Iterator<Item = &'a TimelineItem> + 'a {
        self.items.iter().filter(move |item| &item.row_id == row)
    }
}

/// Override entries as they were before one gesture.
///
/// `None` means the gesture did not touch that map; `Some(previous)` is the
/// entry to put back, where `Some(None)` means there was none.
#[derive(Debug)]
struct TimelineRollback {
    id: TaskId,
    span: Option<Option<Span>>,
    row: Option<Option<ListId>>,
    /// Snapshot changes seen when the gesture ended.
    epoch: u64,
}

#[derive(Debug)]
pub struct TimelineReconciler {
    span_overrides: OverrideMap<TaskId, Span>,
    row_overrides: OverrideMap<TaskId, ListId>,
    remounts: HashMap<TaskId, u32>,
    watch: SnapshotWatch<Task>,
    rollbacks: RollbackLog<TimelineRollback>,
    sync: SyncStatus,
}

impl Default for TimelineReconciler {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl TimelineReconciler {
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            span_overrides: OverrideMap::new(),
            row_overrides: OverrideMap::new(),
            remounts: HashMap::new(),
            watch: SnapshotWatch::new(),
            rollbacks: RollbackLog::new(config.rollback_depth),
            sync: SyncStatus::new(),
        }
    }

    // ====================================================================
    // Snapshot tracking
    // ====================================================================

    /// Feed the authoritative task list. Returns `true` if it is a new
    /// `Arc`, in which case every override was dropped.
    pub fn observe_tasks(&mut self, tasks: &Arc<Vec<Task>>) -> bool {
        if !self.watch.observe(tasks) {
            return false;
        }
        if !self.span_overrides.is_empty() || !self.row_overrides.is_empty() {
            debug!(
                spans = self.span_overrides.len(),
                rows = self.row_overrides.len(),
                "authoritative tasks changed; overrides cleared"
            );
        }
        self.span_overrides.clear();
        self.row_overrides.clear();

        let live: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
        let before = self.remounts.len();
        self.remounts.retain(|id, _| live.contains(id));
        if self.remounts.len() < before {
            trace!(
                dropped = before - self.remounts.len(),
                "remount tokens of departed tasks dropped"
            );
        }
        true
    }

    /// Like [`observe_tasks`](Self::observe_tasks), skipping optimistic
    /// snapshots written by a board coordinator.
    pub fn observe_snapshot(&mut self, snapshot: &Snapshot<Task>) -> bool {
        if snapshot.is_optimistic() {
            return false;
        }
        self.observe_tasks(snapshot.items())
    }

    // ====================================================================
    // Gestures
    // ====================================================================

    /// A bar was dragged: new span from the projector, new row from the
    /// drop target when it is a known list.
    ///
    /// A row change persists the move first and the span second.
    pub fn handle_drag_end(
        &mut self,
        end: TimelineDragEnd<'_>,
        tasks: &[Task],
        lists: &[TaskList],
    ) -> Option<PersistCommand> {
        let _span = info_span!("taskboard.timeline_drag", task = %end.id).entered();
        let task = self.find_dated(tasks, &end.id)?;
        let current_span = self.effective_span(task)?;
        let current_row = self.effective_row(task).clone();

        let new_span = end.projector.project(current_span);
        let new_row = match end.over_row {
            Some(row) if lists.iter().any(|list| list.id == row) => row,
            Some(row) => {
                trace!(row = %row, "drop on unknown row; keeping current row");
                current_row.clone()
            }
            None => current_row.clone(),
        };

        let row_changed = new_row != current_row;
        let span_changed = new_span != current_span;
        if !row_changed && !span_changed {
            trace!("drag ended where it started");
            return None;
        }

        let mut rollback = TimelineRollback {
            id: end.id.clone(),
            span: None,
            row: None,
            epoch: self.watch.changes(),
        };
        let mut requests = Vec::with_capacity(2);

        if row_changed {
            let siblings: Vec<Task> = tasks
                .iter()
                .filter(|t| t.id != end.id && self.effective_row(t) == &new_row)
                .cloned()
                .collect();
            requests.push(PersistRequest::MovePosition {
                collection: CollectionKind::Tasks,
                id: end.id.to_string(),
                scope: new_row.to_string(),
                key: key_at_end(&siblings),
            });
            rollback.row = Some(self.row_overrides.insert(end.id.clone(), new_row.clone()));
        }
        if span_changed {
            requests.push(PersistRequest::UpdateSpan {
                id: end.id.clone(),
                span: new_span,
            });
            rollback.span = Some(self.span_overrides.insert(end.id.clone(), new_span));
        }

        let command = self.issue(rollback, requests);
        debug!(
            ticket = %command.ticket,
            from_row = %current_row,
            to_row = %new_row,
            start = new_span.start,
            end = new_span.end,
            "timeline move applied optimistically"
        );
        Some(command)
    }

    /// An edge of a bar was dragged.
    ///
    /// The remount token is bumped even when the snapped span is unchanged,
    /// since the renderer still holds the drag geometry.
    pub fn handle_resize_end(
        &mut self,
        end: TimelineResizeEnd<'_>,
        tasks: &[Task],
    ) -> Option<PersistCommand> {
        let _span = info_span!("taskboard.timeline_resize", task = %end.id).entered();
        let task = self.find_dated(tasks, &end.id)?;
        let current_span = self.effective_span(task)?;

        let token = self.remounts.entry(end.id.clone()).or_insert(0);
        *token = token.wrapping_add(1);

        let new_span = end.projector.project(current_span);
        if new_span == current_span {
            trace!("resize snapped back to the original span");
            return None;
        }

        let rollback = TimelineRollback {
            id: end.id.clone(),
            span: Some(self.span_overrides.insert(end.id.clone(), new_span)),
            row: None,
            epoch: self.watch.changes(),
        };
        let command = self.issue(
            rollback,
            vec![PersistRequest::UpdateSpan {
                id: end.id.clone(),
                span: new_span,
            }],
        );
        debug!(
            ticket = %command.ticket,
            start = new_span.start,
            end = new_span.end,
            "timeline resize applied optimistically"
        );
        Some(command)
    }

    /// Report the outcome of a command issued by this reconciler.
    ///
    /// On failure the item's override entries go back to what they were
    /// before the gesture, unless a newer authoritative task list has
    /// already replaced them.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<(), PersistError>,
    ) -> Result<(), ReconcileError> {
        self.sync.finish(ticket);
        let record = self.rollbacks.take(ticket);
        let source = match result {
            Ok(()) => return Ok(()),
            Err(source) => source,
        };
        let Some(record) = record else {
            warn!(ticket = %ticket, error = %source, "timeline write rejected; no rollback record");
            return Err(ReconcileError::RollbackUnavailable { ticket, source });
        };

        if record.epoch == self.watch.changes() {
            if let Some(previous) = record.span {
                self.span_overrides.restore(record.id.clone(), previous);
            }
            if let Some(previous) = record.row {
                self.row_overrides.restore(record.id.clone(), previous);
            }
            warn!(
                ticket = %ticket,
                task = %record.id,
                error = %source,
                "timeline write rejected; rolled back"
            );
        } else {
            warn!(
                ticket = %ticket,
                task = %record.id,
                error = %source,
                "timeline write rejected after newer data arrived; rollback skipped"
            );
        }
        Err(ReconcileError::PersistenceRejected {
            id: record.id.to_string(),
            source,
        })
    }

    // ====================================================================
    // Projection
    // ====================================================================

    /// Merge overrides into the cached data.
    #[must_use]
    pub fn project(&self, tasks: &[Task], lists: &[TaskList]) -> TimelineProjection {
        let mut ordered_lists = lists.to_vec();
        sort_by_order(&mut ordered_lists);
        let rank: HashMap<&ListId, usize> = ordered_lists
            .iter()
            .enumerate()
            .map(|(i, list)| (&list.id, i))
            .collect();

        let mut hidden_count = 0;
        let mut placed: Vec<(&Task, TimelineItem)> = Vec::new();
        for task in tasks {
            let Some(span) = self.effective_span(task) else {
                hidden_count += 1;
                continue;
            };
            placed.push((
                task,
                TimelineItem {
                    id: task.id.clone(),
                    row_id: self.effective_row(task).clone(),
                    title: task.title.clone(),
                    span,
                    remount: self.remount(&task.id),
                },
            ));
        }

        let row_rank = |item: &TimelineItem| rank.get(&item.row_id).copied().unwrap_or(usize::MAX);
        placed.sort_by(|(ta, a), (tb, b)| {
            row_rank(a)
                .cmp(&row_rank(b))
                .then(a.span.start.cmp(&b.span.start))
                .then_with(|| {
                    compare_order(
                        ta.order.as_ref().map(OrderKey::as_str),
                        tb.order.as_ref().map(OrderKey::as_str),
                    )
                })
        });

        TimelineProjection {
            rows: ordered_lists
                .into_iter()
                .map(|list| TimelineRow {
                    id: list.id,
                    title: list.title,
                })
                .collect(),
            items: placed.into_iter().map(|(_, item)| item).collect(),
            hidden_count,
        }
    }

    // ====================================================================
    // Query
    // ====================================================================

    /// Current remount token for `id` (0 if never resized).
    #[must_use]
    pub fn remount(&self, id: &TaskId) -> u32 {
        self.remounts.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn span_override(&self, id: &TaskId) -> Option<Span> {
        self.span_overrides.get(id).copied()
    }

    #[must_use]
    pub fn row_override(&self, id: &TaskId) -> Option<&ListId> {
        self.row_overrides.get(id)
    }

    #[must_use]
    pub fn has_overrides(&self) -> bool {
        !self.span_overrides.is_empty() || !self.row_overrides.is_empty()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.sync.in_flight()
    }

    fn effective_span(&self, task: &Task) -> Option<Span> {
        self.span_overrides.get(&task.id).copied().or_else(|| task.span())
    }

    fn effective_row<'a>(&'a self, task: &'a Task) -> &'a ListId {
        self.row_overrides.get(&task.id).unwrap_or(&task.list_id)
    }

    fn find_dated<'a>(&self, tasks: &'a [Task], id: &TaskId) -> Option<&'a Task> {
        let found = tasks.iter().find(|t| &t.id == id);
        match found {
            Some(task) if self.effective_span(task).is_some() => Some(task),
            Some(_) => {
                trace!("gesture on undated task ignored");
                None
            }
            None => {
                trace!("gesture on unknown task ignored");
                None
            }
        }
    }

    fn issue(
        &mut self,
        rollback: TimelineRollback,
        requests: Vec<PersistRequest>,
    ) -> PersistCommand {
        let ticket = self.sync.begin();
        if let Some(evicted) = self.rollbacks.push(ticket, rollback) {
            trace!(evicted = %evicted, "oldest timeline rollback dropped");
        }
        PersistCommand { ticket, requests }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_core::{BoardId, MS_PER_DAY, MoveProjector};

    fn list(id: &str, order: &str) -> TaskList {
        TaskList {
            id: ListId::new(id),
            board_id: BoardId::new("b1"),
            title: id.to_uppercase(),
            order: Some(OrderKey::from_raw(order.to_owned())),
        }
    }

    fn task(id: &str, list: &str, order: &str, span: Option<(i64, i64)>) -> Task {
        Task {
            id: TaskId::new(id),
            board_id: BoardId::new("b1"),
            list_id: ListId::new(list),
            title: id.to_owned(),
            order: Some(OrderKey::from_raw(order.to_owned())),
            start_date: span.map(|s| s.0),
            due_date: span.map(|s| s.1),
            label_ids: Vec::new(),
            sprint_id: None,
        }
    }

    fn board() -> (Vec<Task>, Vec<TaskList>) {
        let lists = vec![list("doing", "b0"), list("todo", "a0")];
        let tasks = vec![
            task("t1", "todo", "a0", Some((1_000, 5_000))),
            task("t2", "todo", "a1", None),
            task("t3", "doing", "a0", Some((0, 2_000))),
        ];
        (tasks, lists)
    }

    fn tid(id: &str) -> TaskId {
        TaskId::new(id)
    }

    #[test]
    fn projection_orders_rows_and_hides_undated() {
        let (tasks, lists) = board();
        let p = TimelineReconciler::default().project(&tasks, &lists);
        let rows: Vec<&str> = p.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(rows, ["todo", "doing"]);
        assert_eq!(p.items.len(), 2);
        assert_eq!(p.items[0].id, tid("t1"));
        assert_eq!(p.hidden_count, 1);
    }

    #[test]
    fn resize_bumps_remount_and_overrides_span() {
        let (tasks, _) = board();
        let mut tl = TimelineReconciler::default();
        let projector = |s: Span| Span::new(s.start, 8_000);
        let cmd = tl
            .handle_resize_end(
                TimelineResizeEnd {
                    id: tid("t1"),
                    projector: &projector,
                },
                &tasks,
            )
            .unwrap();
        assert_eq!(tl.remount(&tid("t1")), 1);
        assert_eq!(tl.span_override(&tid("t1")), Some(Span::new(1_000, 8_000)));
        assert_eq!(
            cmd.requests,
            [PersistRequest::UpdateSpan {
                id: tid("t1"),
                span: Span::new(1_000, 8_000)
            }]
        );
        assert!(tl.is_syncing());
    }

    #[test]
    fn resize_that_snaps_back_still_remounts() {
        let (tasks, _) = board();
        let mut tl = TimelineReconciler::default();
        let projector = |s: Span| s;
        let cmd = tl.handle_resize_end(
            TimelineResizeEnd {
                id: tid("t1"),
                projector: &projector,
            },
            &tasks,
        );
        assert!(cmd.is_none());
        assert_eq!(tl.remount(&tid("t1")), 1);
        assert!(!tl.has_overrides());
    }

    #[test]
    fn row_change_is_move_then_span() {
        let (tasks, lists) = board();
        let mut tl = TimelineReconciler::default();
        let projector = MoveProjector {
            delta_ms: MS_PER_DAY,
        };
        let cmd = tl
            .handle_drag_end(
                TimelineDragEnd {
                    id: tid("t1"),
                    over_row: Some(ListId::new("doing")),
                    projector: &projector,
                },
                &tasks,
                &lists,
            )
            .unwrap();
        assert_eq!(cmd.requests.len(), 2);
        match &cmd.requests[0] {
            PersistRequest::MovePosition { scope, key, .. } => {
                assert_eq!(scope, "doing");
                assert!(key.as_str() > "a0");
            }
            other => panic!("expected move first, got {other:?}"),
        }
        assert!(matches!(cmd.requests[1], PersistRequest::UpdateSpan { .. }));

        let p = tl.project(&tasks, &lists);
        let moved = p.items.iter().find(|i| i.id == tid("t1")).unwrap();
        assert_eq!(moved.row_id, ListId::new("doing"));
        assert_eq!(moved.span, Span::new(1_000 + MS_PER_DAY, 5_000 + MS_PER_DAY));
    }

    #[test]
    fn unknown_row_keeps_current_row() {
        let (tasks, lists) = board();
        let mut tl = TimelineReconciler::default();
        let projector = MoveProjector { delta_ms: 0 };
        let cmd = tl.handle_drag_end(
            TimelineDragEnd {
                id: tid("t1"),
                over_row: Some(ListId::new("gone")),
                projector: &projector,
            },
            &tasks,
            &lists,
        );
        assert!(cmd.is_none());
    }

    #[test]
    fn rejection_restores_previous_overrides() {
        let (tasks, lists) = board();
        let mut tl = TimelineReconciler::default();
        tl.observe_tasks(&Arc::new(tasks.clone()));
        let projector = MoveProjector {
            delta_ms: MS_PER_DAY,
        };
        let cmd = tl
            .handle_drag_end(
                TimelineDragEnd {
                    id: tid("t1"),
                    over_row: Some(ListId::new("doing")),
                    projector: &projector,
                },
                &tasks,
                &lists,
            )
            .unwrap();
        let err = tl
            .complete(cmd.ticket, Err(PersistError::Rejected("locked".into())))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::PersistenceRejected { ref id, .. } if id == "t1"));
        assert!(!tl.has_overrides());
        assert!(!tl.is_syncing());
    }

    #[test]
    fn new_authoritative_list_clears_overrides() {
        let (tasks, _) = board();
        let mut tl = TimelineReconciler::default();
        let first = Arc::new(tasks.clone());
        tl.observe_tasks(&first);
        let projector = |s: Span| s.shifted(10);
        tl.handle_resize_end(
            TimelineResizeEnd {
                id: tid("t1"),
                projector: &projector,
            },
            &tasks,
        );
        assert!(tl.has_overrides());
        assert!(!tl.observe_tasks(&first));
        assert!(tl.has_overrides());
        assert!(tl.observe_tasks(&Arc::new(tasks)));
        assert!(!tl.has_overrides());
        // Remount tokens survive.
        assert_eq!(tl.remount(&tid("t1")), 1);
    }

    #[test]
    fn remount_tokens_follow_the_authoritative_list() {
        let (tasks, _) = board();
        let mut tl = TimelineReconciler::default();
        tl.observe_tasks(&Arc::new(tasks.clone()));
        let identity = |s: Span| s;
        for id in ["t1", "t3"] {
            tl.handle_resize_end(
                TimelineResizeEnd {
                    id: tid(id),
                    projector: &identity,
                },
                &tasks,
            );
        }
        assert_eq!(tl.remount(&tid("t1")), 1);
        assert_eq!(tl.remount(&tid("t3")), 1);

        // t3 was deleted remotely.
        let remaining: Vec<Task> = tasks.iter().filter(|t| t.id != tid("t3")).cloned().collect();
        assert!(tl.observe_tasks(&Arc::new(remaining)));
        assert_eq!(tl.remount(&tid("t1")), 1);
        assert_eq!(tl.remount(&tid("t3")), 0);

        // A different board shares no ids.
        let other = vec![task("x1", "todo", "a0", Some((0, 1_000)))];
        assert!(tl.observe_tasks(&Arc::new(other)));
        assert_eq!(tl.remount(&tid("t1")), 0);
    }

    #[test]
    fn undated_task_gestures_are_ignored() {
        let (tasks, lists) = board();
        let mut tl = TimelineReconciler::default();
        let projector = MoveProjector {
            delta_ms: MS_PER_DAY,
        };
        let cmd = tl.handle_drag_end(
            TimelineDragEnd {
                id: tid("t2"),
                over_row: None,
                projector: &projector,
            },
            &tasks,
            &lists,
        );
        assert!(cmd.is_none());
        assert_eq!(tl.remount(&tid("t2")), 0);
    }
}
