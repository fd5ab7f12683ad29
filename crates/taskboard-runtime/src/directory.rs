#![forbid(unsafe_code)]

//! Board directory: the boards a user owns and the boards shared with them.
//!
//! The two lists are independent subscriptions. One failing does not hide
//! the other; each side reports its own [`CollectionState`].

use std::rc::Rc;
use std::sync::Arc;

use taskboard_core::{BoardSummary, UserId};
use tracing::debug;

use crate::live_cache::{CollectionState, LiveCollection};
use crate::transport::{QueryDescriptor, SubscriptionTransport};

pub struct BoardDirectory {
    transport: Rc<dyn SubscriptionTransport>,
    user: Option<UserId>,
    owned: LiveCollection<BoardSummary>,
    shared: LiveCollection<BoardSummary>,
}

impl std::fmt::Debug for BoardDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardDirectory")
            .field("user", &self.user)
            .field("owned", &self.owned.items().len())
            .field("shared", &self.shared.items().len())
            .finish()
    }
}

impl BoardDirectory {
    #[must_use]
    pub fn new(transport: Rc<dyn SubscriptionTransport>) -> Self {
        Self {
            transport,
            user: None,
            owned: LiveCollection::new(),
            shared: LiveCollection::new(),
        }
    }

    /// Follow `user`'s boards; `None` signs out and clears both lists.
    pub fn open(&mut self, user: Option<UserId>) {
        if user == self.user {
            return;
        }
        self.owned.unsubscribe();
        self.shared.unsubscribe();
        self.user = None;
        let Some(user) = user else {
            return;
        };
        debug!(user = %user, "opening board directory");
        let transport = Rc::clone(&self.transport);
        self.owned
            .subscribe(transport.as_ref(), QueryDescriptor::owned_boards(&user));
        self.shared
            .subscribe(transport.as_ref(), QueryDescriptor::shared_boards(&user));
        self.user = Some(user);
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn owned_state(&self) -> CollectionState<BoardSummary> {
        self.owned.state()
    }

    #[must_use]
    pub fn shared_state(&self) -> CollectionState<BoardSummary> {
        self.shared.state()
    }

    /// Owned boards sorted by title.
    #[must_use]
    pub fn owned(&self) -> Vec<BoardSummary> {
        by_title(&self.owned.items())
    }

    /// Boards shared with the user, sorted by title.
    #[must_use]
    pub fn shared(&self) -> Vec<BoardSummary> {
        by_title(&self.shared.items())
    }
}

fn by_title(items: &Arc<Vec<BoardSummary>>) -> Vec<BoardSummary> {
    let mut boards = items.as_ref().clone();
    boards.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
    boards
}
