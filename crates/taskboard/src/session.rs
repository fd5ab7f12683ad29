#![forbid(unsafe_code)]

//! One open board with everything needed to render and edit it.
//!
//! [`BoardSession`] owns the board's live views (lists, tasks, labels,
//! sprints), the kanban [`Coordinator`], and the [`TimelineReconciler`].
//! The coordinator and the reconciler number their tickets independently,
//! so every command the session hands out is tagged with its [`Origin`]
//! and completion is routed back to the component that issued it.

use std::rc::Rc;

use taskboard_core::{
    BoardId, GestureEnd, GestureOver, GestureStart, TimelineDragEnd, TimelineResizeEnd,
};
use taskboard_reconcile::{
    Coordinator, DateHeader, DateRange, PersistCommand, PersistError, RangeExpander,
    RemotePersistence, SyncConfig, Ticket, TimelineProjection, TimelineReconciler,
};
use taskboard_runtime::{BoardView, LabelsAndSprints, SubscriptionTransport};
use tracing::debug;

use crate::Result;

/// Which component issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Board,
    Timeline,
}

/// A persistence command tagged with its issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCommand {
    pub origin: Origin,
    pub command: PersistCommand,
}

impl SessionCommand {
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        self.command.ticket
    }

    /// Run the remote requests in order, stopping at the first failure.
    pub fn execute(&self, remote: &dyn RemotePersistence) -> std::result::Result<(), PersistError> {
        self.command.execute(remote)
    }
}

pub struct BoardSession {
    view: BoardView,
    taxonomy: LabelsAndSprints,
    coordinator: Coordinator,
    timeline: TimelineReconciler,
    header: DateHeader,
    config: SyncConfig,
}

impl std::fmt::Debug for BoardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("board", &self.view.board_id())
            .field("status", &self.view.status())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl BoardSession {
    /// A session with nothing open. Fails if `config` does not validate.
    pub fn new(transport: Rc<dyn SubscriptionTransport>, config: SyncConfig) -> Result<Self> {
        let config = config.into_validated()?;
        Ok(Self {
            view: BoardView::new(Rc::clone(&transport)),
            taxonomy: LabelsAndSprints::new(transport),
            coordinator: Coordinator::new(&config.cache),
            timeline: TimelineReconciler::new(&config.cache),
            header: DateHeader::new(&config.timeline),
            config,
        })
    }

    /// Switch to `board` (or close with `None`).
    pub fn open(&mut self, board: Option<BoardId>) {
        if self.view.board_id() != board.as_ref() {
            debug!(from = ?self.view.board_id(), to = ?board, "board session switching");
        }
        self.coordinator.cancel();
        self.view.open(board.clone());
        self.taxonomy.open(board);
    }

    pub fn close(&mut self) {
        self.open(None);
    }

    #[must_use]
    pub fn view(&self) -> &BoardView {
        &self.view
    }

    #[must_use]
    pub fn taxonomy(&self) -> &LabelsAndSprints {
        &self.taxonomy
    }

    #[must_use]
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    #[must_use]
    pub fn timeline(&self) -> &TimelineReconciler {
        &self.timeline
    }

    #[must_use]
    pub fn header(&self) -> &DateHeader {
        &self.header
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// An edge expander for `range`, configured like this session.
    #[must_use]
    pub fn expander(&self, range: DateRange) -> RangeExpander {
        RangeExpander::new(range, &self.config.timeline)
    }

    // --- Kanban gestures --------------------------------------------------

    pub fn gesture_start(&mut self, start: GestureStart) {
        self.coordinator.handle_gesture_start(start);
    }

    pub fn gesture_over(&mut self, over: GestureOver) {
        self.coordinator.handle_gesture_over(over);
    }

    /// Finish a task move or list reorder.
    pub fn gesture_end(&mut self, end: GestureEnd) -> Option<SessionCommand> {
        let command = self.coordinator.handle_gesture_end(end, &self.view)?;
        Some(board_command(command))
    }

    /// Finish a label reorder.
    pub fn label_end(&mut self, end: GestureEnd) -> Option<SessionCommand> {
        let command = self
            .coordinator
            .handle_group_end(end, self.taxonomy.labels_collection())?;
        Some(board_command(command))
    }

    /// Finish a sprint reorder.
    pub fn sprint_end(&mut self, end: GestureEnd) -> Option<SessionCommand> {
        let command = self
            .coordinator
            .handle_group_end(end, self.taxonomy.sprints_collection())?;
        Some(board_command(command))
    }

    // --- Timeline ---------------------------------------------------------

    /// Rows and bars for the timeline, overrides merged.
    pub fn projection(&mut self) -> TimelineProjection {
        self.sync_timeline();
        self.timeline
            .project(&self.view.all_tasks(), &self.view.lists())
    }

    pub fn timeline_drag_end(&mut self, end: TimelineDragEnd<'_>) -> Option<SessionCommand> {
        self.sync_timeline();
        let tasks = self.view.all_tasks();
        let lists = self.view.lists();
        let command = self.timeline.handle_drag_end(end, &tasks, &lists)?;
        Some(timeline_command(command))
    }

    pub fn timeline_resize_end(&mut self, end: TimelineResizeEnd<'_>) -> Option<SessionCommand> {
        self.sync_timeline();
        let tasks = self.view.all_tasks();
        let command = self.timeline.handle_resize_end(end, &tasks)?;
        Some(timeline_command(command))
    }

    // --- Completion -------------------------------------------------------

    /// Report the outcome of a command to the component that issued it.
    pub fn complete(
        &mut self,
        command: &SessionCommand,
        result: std::result::Result<(), PersistError>,
    ) -> Result<()> {
        let ticket = command.ticket();
        match command.origin {
            Origin::Board => self.coordinator.complete(ticket, result)?,
            Origin::Timeline => self.timeline.complete(ticket, result)?,
        }
        Ok(())
    }

    /// Execute `command` against `remote` inline and complete it.
    pub fn run(&mut self, command: &SessionCommand, remote: &dyn RemotePersistence) -> Result<()> {
        let result = command.execute(remote);
        self.complete(command, result)
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.coordinator.is_syncing() || self.timeline.is_syncing()
    }

    fn sync_timeline(&mut self) {
        if let Some(snapshot) = self.view.tasks_collection().snapshot() {
            self.timeline.observe_snapshot(&snapshot);
        }
    }
}

fn board_command(command: PersistCommand) -> SessionCommand {
    SessionCommand {
        origin: Origin::Board,
        command,
    }
}

fn timeline_command(command: PersistCommand) -> SessionCommand {
    SessionCommand {
        origin: Origin::Timeline,
        command,
    }
}
