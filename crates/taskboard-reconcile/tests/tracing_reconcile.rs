#![forbid(unsafe_code)]

//! Log-level policy for reconciliation.
//!
//! Gesture handling runs inside `taskboard.gesture_end`; ignored drops are
//! `TRACE`, optimistic writes `DEBUG`, and rollbacks `WARN`.
//!
//! Run:
//!   cargo test -p taskboard-reconcile --test tracing_reconcile

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde_json::json;
use taskboard_core::{
    BoardId, DragId, DragKind, DropTarget, GestureEnd, GestureStart, RawDocument,
};
use taskboard_reconcile::{Coordinator, PersistError};
use taskboard_runtime::{BoardView, MemoryTransport, QueryDescriptor};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    message: String,
    span: Option<String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        let span = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
            span,
        });
    }
}

fn capture(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(EventCapture {
            events: Arc::clone(&events),
        });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn board() -> (MemoryTransport, BoardView) {
    let transport = MemoryTransport::new();
    let mut view = BoardView::new(Rc::new(transport.clone()));
    let id = BoardId::new("b1");
    view.open(Some(id.clone()));
    transport.publish(
        &QueryDescriptor::board(&id),
        vec![RawDocument::new("b1", json!({"title": "B", "ownerId": "u1"}))],
    );
    transport.publish(
        &QueryDescriptor::lists(&id),
        vec![RawDocument::new("l1", json!({"boardId": "b1", "title": "L", "order": "a0"}))],
    );
    transport.publish(
        &QueryDescriptor::tasks(&id),
        vec![RawDocument::new(
            "t1",
            json!({"boardId": "b1", "listId": "l1", "title": "T", "order": "a0"}),
        )],
    );
    (transport, view)
}

fn end(coord: &mut Coordinator, view: &BoardView, over: Option<DropTarget>) -> Option<u64> {
    coord.handle_gesture_start(GestureStart {
        id: DragId::new("t1"),
        kind: DragKind::Item,
    });
    coord
        .handle_gesture_end(
            GestureEnd {
                active: DragId::new("t1"),
                over,
            },
            view,
        )
        .map(|cmd| cmd.ticket.get())
}

#[test]
fn ignored_drop_is_trace_inside_gesture_span() {
    let (_t, view) = board();
    let mut coord = Coordinator::default();
    let events = capture(|| {
        assert!(end(&mut coord, &view, None).is_none());
    });
    let ignored = events
        .iter()
        .find(|e| e.message.contains("gesture ignored"))
        .expect("ignored drop should be logged");
    assert_eq!(ignored.level, Level::TRACE);
    assert_eq!(ignored.span.as_deref(), Some("taskboard.gesture_end"));
    assert!(events
        .iter()
        .all(|e| e.level != Level::WARN && e.level != Level::ERROR));
}

#[test]
fn rejection_logs_warning() {
    let (_t, view) = board();
    let mut coord = Coordinator::default();
    let target = Some(DropTarget::Container(DragId::new("l1")));
    let events = capture(|| {
        let ticket = end(&mut coord, &view, target).expect("move should be issued");
        let result = coord.complete(
            taskboard_reconcile::Ticket::new(ticket),
            Err(PersistError::Rejected("denied".into())),
        );
        assert!(result.is_err());
    });
    assert!(events
        .iter()
        .any(|e| e.level == Level::DEBUG && e.message.contains("optimistic move")));
    assert!(events
        .iter()
        .any(|e| e.level == Level::WARN && e.message.contains("rolled back")));
    assert!(events.iter().all(|e| e.level != Level::ERROR));
}
