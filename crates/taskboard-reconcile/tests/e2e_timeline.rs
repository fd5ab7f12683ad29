#![forbid(unsafe_code)]

//! Timeline scenarios: projection, gestures against a live task cache,
//! header virtualization and range expansion working together.
//!
//! Run:
//!   cargo test -p taskboard-reconcile --test e2e_timeline

use std::rc::Rc;

use chrono::NaiveDate;
use serde_json::json;
use taskboard_core::{
    BoardId, ListId, MS_PER_DAY, MoveProjector, RawDocument, ResizeEdge, ResizeProjector, Span,
    TaskId, TimelineDragEnd, TimelineResizeEnd,
};
use taskboard_reconcile::{
    DateHeader, DateRange, ExpandDirection, PersistError, PersistRequest, RangeExpander,
    ReconcileError, ScrollMetrics, TimelineConfig, TimelineReconciler, Viewport,
};
use taskboard_runtime::{BoardView, MemoryTransport, QueryDescriptor};

const DAY: i64 = MS_PER_DAY;

fn task_doc(id: &str, list: &str, order: &str, span: Option<(i64, i64)>) -> RawDocument {
    let mut doc = json!({"boardId": "b1", "listId": list, "title": id, "order": order});
    if let Some((start, due)) = span {
        doc["startDate"] = json!(start);
        doc["dueDate"] = json!(due);
    }
    RawDocument::new(id, doc)
}

fn tasks_v1() -> Vec<RawDocument> {
    vec![
        task_doc("design", "todo", "a0", Some((1_000, 5_000))),
        task_doc("build", "todo", "a1", Some((2 * DAY, 6 * DAY))),
        task_doc("idea", "todo", "a2", None),
        task_doc("ship", "doing", "a0", Some((7 * DAY, 9 * DAY))),
    ]
}

fn open_board() -> (MemoryTransport, BoardView) {
    let transport = MemoryTransport::new();
    let mut view = BoardView::new(Rc::new(transport.clone()));
    let id = BoardId::new("b1");
    view.open(Some(id.clone()));
    transport.publish(
        &QueryDescriptor::board(&id),
        vec![RawDocument::new("b1", json!({"title": "Plan", "ownerId": "u1"}))],
    );
    transport.publish(
        &QueryDescriptor::lists(&id),
        vec![
            RawDocument::new("doing", json!({"boardId": "b1", "title": "Doing", "order": "a1"})),
            RawDocument::new("todo", json!({"boardId": "b1", "title": "Todo", "order": "a0"})),
        ],
    );
    transport.publish(&QueryDescriptor::tasks(&id), tasks_v1());
    (transport, view)
}

fn sync(timeline: &mut TimelineReconciler, view: &BoardView) -> bool {
    match view.tasks_collection().snapshot() {
        Some(snapshot) => timeline.observe_snapshot(&snapshot),
        None => false,
    }
}

fn tid(id: &str) -> TaskId {
    TaskId::new(id)
}

#[test]
fn projection_counts_undated_tasks() {
    let (_t, view) = open_board();
    let mut timeline = TimelineReconciler::default();
    sync(&mut timeline, &view);

    let p = timeline.project(&view.all_tasks(), &view.lists());
    let rows: Vec<_> = p.rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(rows, ["Todo", "Doing"]);
    assert_eq!(p.items.len(), 3);
    assert_eq!(p.hidden_count, 1);
    let todo_row = ListId::new("todo");
    let todo: Vec<_> = p
        .items_in(&todo_row)
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(todo, ["design", "build"]);
}

#[test]
fn dating_a_hidden_task_moves_it_onto_the_timeline() {
    let (transport, view) = open_board();
    let mut timeline = TimelineReconciler::default();
    sync(&mut timeline, &view);

    let before = timeline.project(&view.all_tasks(), &view.lists());
    assert_eq!(before.hidden_count, 1);
    assert!(before.items.iter().all(|i| i.id != tid("idea")));

    let mut tasks = tasks_v1();
    tasks[2] = task_doc("idea", "todo", "a2", Some((3 * DAY, 4 * DAY)));
    transport.publish(&QueryDescriptor::tasks(&BoardId::new("b1")), tasks);
    assert!(sync(&mut timeline, &view));

    let after = timeline.project(&view.all_tasks(), &view.lists());
    assert_eq!(after.hidden_count, before.hidden_count - 1);
    assert_eq!(after.items.len(), before.items.len() + 1);
    let idea = after.items.iter().find(|i| i.id == tid("idea")).unwrap();
    assert_eq!(idea.row_id, ListId::new("todo"));
    assert_eq!(idea.span, Span::new(3 * DAY, 4 * DAY));
}

#[test]
fn resize_extends_span_and_bumps_remount_once() {
    let (_t, view) = open_board();
    let mut timeline = TimelineReconciler::default();
    sync(&mut timeline, &view);

    let stretch = |s: Span| Span::new(s.start, 8_000);
    let cmd = timeline
        .handle_resize_end(
            TimelineResizeEnd {
                id: tid("design"),
                projector: &stretch,
            },
            &view.all_tasks(),
        )
        .unwrap();
    assert_eq!(
        cmd.requests,
        [PersistRequest::UpdateSpan {
            id: tid("design"),
            span: Span::new(1_000, 8_000),
        }]
    );

    let p = timeline.project(&view.all_tasks(), &view.lists());
    let design = p.items.iter().find(|i| i.id == tid("design")).unwrap();
    assert_eq!(design.span, Span::new(1_000, 8_000));
    assert_eq!(design.remount, 1);
    assert_eq!(design.render_key(), "design#1");
}

#[test]
fn confirmed_write_is_replaced_by_server_data() {
    let (transport, view) = open_board();
    let mut timeline = TimelineReconciler::default();
    sync(&mut timeline, &view);

    let projector = ResizeProjector::from_pixels(ResizeEdge::End, 80.0, 40.0);
    let cmd = timeline
        .handle_resize_end(
            TimelineResizeEnd {
                id: tid("build"),
                projector: &projector,
            },
            &view.all_tasks(),
        )
        .unwrap();
    timeline.complete(cmd.ticket, Ok(())).unwrap();
    assert_eq!(timeline.span_override(&tid("build")), Some(Span::new(2 * DAY, 8 * DAY)));

    let mut confirmed = tasks_v1();
    confirmed[1] = task_doc("build", "todo", "a1", Some((2 * DAY, 8 * DAY)));
    transport.publish(&QueryDescriptor::tasks(&BoardId::new("b1")), confirmed);
    assert!(sync(&mut timeline, &view));
    assert!(!timeline.has_overrides());

    let p = timeline.project(&view.all_tasks(), &view.lists());
    let build = p.items.iter().find(|i| i.id == tid("build")).unwrap();
    assert_eq!(build.span, Span::new(2 * DAY, 8 * DAY));
}

#[test]
fn row_move_rejection_restores_row_and_span() {
    let (_t, view) = open_board();
    let mut timeline = TimelineReconciler::default();
    sync(&mut timeline, &view);

    let projector = MoveProjector::from_pixels(40.0, 40.0);
    let cmd = timeline
        .handle_drag_end(
            TimelineDragEnd {
                id: tid("build"),
                over_row: Some(ListId::new("doing")),
                projector: &projector,
            },
            &view.all_tasks(),
            &view.lists(),
        )
        .unwrap();
    assert!(matches!(
        &cmd.requests[..],
        [
            PersistRequest::MovePosition { scope, .. },
            PersistRequest::UpdateSpan { .. },
        ] if scope == "doing"
    ));

    let p = timeline.project(&view.all_tasks(), &view.lists());
    let doing_row = ListId::new("doing");
    let doing: Vec<_> = p
        .items_in(&doing_row)
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(doing, ["build", "ship"]);

    let err = timeline
        .complete(cmd.ticket, Err(PersistError::PermissionDenied("viewer".into())))
        .unwrap_err();
    assert!(matches!(err, ReconcileError::PersistenceRejected { .. }));
    let p = timeline.project(&view.all_tasks(), &view.lists());
    let build = p.items.iter().find(|i| i.id == tid("build")).unwrap();
    assert_eq!(build.row_id, ListId::new("todo"));
    assert_eq!(build.span, Span::new(2 * DAY, 6 * DAY));
}

#[test]
fn rejection_after_new_snapshot_does_not_resurrect_override() {
    let (transport, view) = open_board();
    let mut timeline = TimelineReconciler::default();
    sync(&mut timeline, &view);

    // The resize is only rejected after fresh data has replaced the cache.
    let grow = |s: Span| Span::new(s.start, s.end + DAY);
    let tasks = view.all_tasks();
    let first = timeline
        .handle_resize_end(
            TimelineResizeEnd {
                id: tid("ship"),
                projector: &grow,
            },
            &tasks,
        )
        .unwrap();

    transport.publish(&QueryDescriptor::tasks(&BoardId::new("b1")), tasks_v1());
    assert!(sync(&mut timeline, &view));

    assert!(timeline
        .complete(first.ticket, Err(PersistError::Rejected("stale".into())))
        .is_err());
    assert_eq!(timeline.span_override(&tid("ship")), None);
    assert_eq!(timeline.remount(&tid("ship")), 1);
}

#[test]
fn header_follows_scroll_and_falls_back_before_layout() {
    let config = TimelineConfig::default();
    let header = DateHeader::new(&config);
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
    let range = DateRange::new(start, end);

    assert_eq!(header.days(&range, Viewport::UNKNOWN).len(), range.day_count());

    let viewport = Viewport::new(20.0 * config.px_per_day, 10.0 * config.px_per_day);
    let days = header.days(&range, viewport);
    assert_eq!(days.first().unwrap().index, 17);
    assert_eq!(days.last().unwrap().index, 32);
}

#[test]
fn scrolling_to_the_left_edge_grows_range_once_per_layout() {
    let config = TimelineConfig::default();
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let mut expander = RangeExpander::new(DateRange::new(start, end), &config);
    let content = expander.range().width_px(config.px_per_day);

    let at_left = ScrollMetrics {
        scroll_left: 10.0,
        viewport_width: 300.0,
        content_width: content,
    };
    let grown = expander.on_scroll(at_left).unwrap();
    assert_eq!(grown.direction, ExpandDirection::Backward);
    assert_eq!(grown.scroll_adjust_px, f64::from(config.expand_days) * config.px_per_day);
    assert_eq!(expander.on_scroll(at_left), None);

    expander.finish();
    let relaid = ScrollMetrics {
        scroll_left: at_left.scroll_left + grown.scroll_adjust_px,
        viewport_width: 300.0,
        content_width: expander.range().width_px(config.px_per_day),
    };
    assert_eq!(expander.on_scroll(relaid), None);
}
