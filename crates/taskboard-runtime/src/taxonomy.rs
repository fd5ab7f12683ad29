#![forbid(unsafe_code)]

//! Labels and sprints of one board.
//!
//! Both collections are board-scoped and ordered, so the reconciliation
//! layer reorders them through the same group path as lists.

use std::rc::Rc;

use taskboard_core::{BoardId, Label, Sprint, sort_by_order};

use crate::live_cache::LiveCollection;
use crate::transport::{QueryDescriptor, SubscriptionTransport};

pub struct LabelsAndSprints {
    transport: Rc<dyn SubscriptionTransport>,
    board_id: Option<BoardId>,
    labels: LiveCollection<Label>,
    sprints: LiveCollection<Sprint>,
}

impl std::fmt::Debug for LabelsAndSprints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelsAndSprints")
            .field("board_id", &self.board_id)
            .finish_non_exhaustive()
    }
}

impl LabelsAndSprints {
    #[must_use]
    pub fn new(transport: Rc<dyn SubscriptionTransport>) -> Self {
        Self {
            transport,
            board_id: None,
            labels: LiveCollection::new(),
            sprints: LiveCollection::new(),
        }
    }

    pub fn open(&mut self, board_id: Option<BoardId>) {
        if board_id == self.board_id {
            return;
        }
        self.labels.unsubscribe();
        self.sprints.unsubscribe();
        self.board_id = None;
        let Some(id) = board_id else {
            return;
        };
        let transport = Rc::clone(&self.transport);
        self.labels
            .subscribe(transport.as_ref(), QueryDescriptor::labels(&id));
        self.sprints
            .subscribe(transport.as_ref(), QueryDescriptor::sprints(&id));
        self.board_id = Some(id);
    }

    #[must_use]
    pub fn board_id(&self) -> Option<&BoardId> {
        self.board_id.as_ref()
    }

    /// `true` until both collections have delivered.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.board_id.is_some() && !(self.labels.has_delivered() && self.sprints.has_delivered())
    }

    #[must_use]
    pub fn labels(&self) -> Vec<Label> {
        let mut labels = self.labels.items().as_ref().clone();
        sort_by_order(&mut labels);
        labels
    }

    #[must_use]
    pub fn sprints(&self) -> Vec<Sprint> {
        let mut sprints = self.sprints.items().as_ref().clone();
        sort_by_order(&mut sprints);
        sprints
    }

    #[must_use]
    pub fn labels_collection(&self) -> &LiveCollection<Label> {
        &self.labels
    }

    #[must_use]
    pub fn sprints_collection(&self) -> &LiveCollection<Sprint> {
        &self.sprints
    }
}
