#![forbid(unsafe_code)]

//! Board view: the three live collections a board screen needs.
//!
//! A board is rendered from its metadata document, its lists, and its tasks.
//! [`BoardView::open`] subscribes to all three at once and reports
//! [`BoardStatus::Loading`] until every one of them has delivered a
//! snapshot, so a view never renders a board whose tasks have not arrived.
//! Opening with `None` short-circuits to [`BoardStatus::Empty`] with no
//! subscriptions at all.

use std::rc::Rc;
use std::sync::Arc;

use taskboard_core::{Board, BoardId, ListId, Task, TaskList, sort_by_order};
use tracing::debug;

use crate::error::SubscriptionError;
use crate::live_cache::{CollectionState, LiveCollection};
use crate::transport::{QueryDescriptor, SubscriptionTransport};

/// Render status of a [`BoardView`].
#[derive(Debug, Clone, PartialEq)]
pub enum BoardStatus {
    /// No board selected.
    Empty,
    /// At least one of board, lists, tasks has not delivered yet.
    Loading,
    /// A subscription failed; partial data is not shown.
    Failed(SubscriptionError),
    /// All three delivered, but the board document does not exist.
    Missing,
    Ready,
}

impl BoardStatus {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Live board, lists and tasks for one board id.
pub struct BoardView {
    transport: Rc<dyn SubscriptionTransport>,
    board_id: Option<BoardId>,
    board: LiveCollection<Board>,
    lists: LiveCollection<TaskList>,
    tasks: LiveCollection<Task>,
}

impl std::fmt::Debug for BoardView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardView")
            .field("board_id", &self.board_id)
            .field("status", &self.status())
            .finish()
    }
}

impl BoardView {
    #[must_use]
    pub fn new(transport: Rc<dyn SubscriptionTransport>) -> Self {
        Self {
            transport,
            board_id: None,
            board: LiveCollection::new(),
            lists: LiveCollection::new(),
            tasks: LiveCollection::new(),
        }
    }

    /// Switch to `board_id`.
    ///
    /// Switching tears down the previous board's subscriptions and clears
    /// their cached data before the new ones start. Re-opening the current id
    /// is a no-op.
    pub fn open(&mut self, board_id: Option<BoardId>) {
        if board_id == self.board_id {
            return;
        }
        self.close();
        let Some(id) = board_id else {
            return;
        };
        debug!(board = %id, "opening board");
        let transport = Rc::clone(&self.transport);
        self.board
            .subscribe(transport.as_ref(), QueryDescriptor::board(&id));
        self.lists
            .subscribe(transport.as_ref(), QueryDescriptor::lists(&id));
        self.tasks
            .subscribe(transport.as_ref(), QueryDescriptor::tasks(&id));
        self.board_id = Some(id);
    }

    /// Release every subscription and clear the cache.
    pub fn close(&mut self) {
        if let Some(id) = self.board_id.take() {
            debug!(board = %id, "closing board");
        }
        self.board.unsubscribe();
        self.lists.unsubscribe();
        self.tasks.unsubscribe();
    }

    /// Re-establish any failed subscription for the current board.
    pub fn retry_failed(&mut self) {
        let transport = Rc::clone(&self.transport);
        retry(&mut self.board, transport.as_ref());
        retry(&mut self.lists, transport.as_ref());
        retry(&mut self.tasks, transport.as_ref());
    }

    #[must_use]
    pub fn board_id(&self) -> Option<&BoardId> {
        self.board_id.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> BoardStatus {
        if self.board_id.is_none() {
            return BoardStatus::Empty;
        }
        let states = [
            failure_or_pending(&self.board.state()),
            failure_or_pending(&self.lists.state()),
            failure_or_pending(&self.tasks.state()),
        ];
        if let Some(err) = states.iter().find_map(|s| s.clone().err()) {
            return BoardStatus::Failed(err);
        }
        if states.iter().any(|s| matches!(s, Ok(false))) {
            return BoardStatus::Loading;
        }
        if self.board.items().is_empty() {
            return BoardStatus::Missing;
        }
        BoardStatus::Ready
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status().is_loading()
    }

    /// Board metadata, once delivered.
    #[must_use]
    pub fn board(&self) -> Option<Board> {
        self.board.items().first().cloned()
    }

    /// Lists in display order.
    #[must_use]
    pub fn lists(&self) -> Vec<TaskList> {
        let mut lists = self.lists.items().as_ref().clone();
        sort_by_order(&mut lists);
        lists
    }

    /// Tasks of one list in display order.
    #[must_use]
    pub fn tasks_in(&self, list: &ListId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .items()
            .iter()
            .filter(|t| &t.list_id == list)
            .cloned()
            .collect();
        sort_by_order(&mut tasks);
        tasks
    }

    /// All tasks as cached (unsorted, reference-stable between writes).
    #[must_use]
    pub fn all_tasks(&self) -> Arc<Vec<Task>> {
        self.tasks.items()
    }

    #[must_use]
    pub fn lists_collection(&self) -> &LiveCollection<TaskList> {
        &self.lists
    }

    #[must_use]
    pub fn tasks_collection(&self) -> &LiveCollection<Task> {
        &self.tasks
    }

    #[must_use]
    pub fn board_collection(&self) -> &LiveCollection<Board> {
        &self.board
    }
}

/// `Ok(true)` delivered, `Ok(false)` pending, `Err` failed.
fn failure_or_pending<T>(state: &CollectionState<T>) -> Result<bool, SubscriptionError> {
    match state {
        CollectionState::Failed(e) => Err(e.clone()),
        CollectionState::Ready(_) => Ok(true),
        CollectionState::Idle | CollectionState::Loading => Ok(false),
    }
}

fn retry<T>(collection: &mut LiveCollection<T>, transport: &dyn SubscriptionTransport)
where
    T: taskboard_core::Decode + Clone + 'static,
{
    let failed = collection.state().error().is_some();
    if let (true, Some(query)) = (failed, collection.query().cloned()) {
        collection.subscribe(transport, query);
    }
}
