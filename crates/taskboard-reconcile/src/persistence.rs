#![forbid(unsafe_code)]

//! Persistence commands.
//!
//! Gesture handlers never call the backend themselves. They apply the
//! optimistic write, then hand the host a [`PersistCommand`]: a ticket plus
//! the ordered remote requests. The host runs it wherever it likes (inline,
//! on a worker, in an async task) and reports the outcome back through the
//! issuing component's `complete(ticket, result)`.
//!
//! ```text
//! gesture end ──► optimistic write ──► PersistCommand ──► host
//!                                                          │ execute()
//!                 rollback / nothing ◄── complete(ticket) ◄┘
//! ```

use std::collections::BTreeSet;
use std::fmt;

use taskboard_core::{OrderKey, Span, TaskId};
use taskboard_runtime::CollectionKind;
use tracing::debug;

use crate::error::PersistError;

/// Correlates a command with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket#{}", self.0)
    }
}

/// Issues increasing tickets and tracks which are still in flight.
#[derive(Debug, Default)]
pub struct SyncStatus {
    next: u64,
    pending: BTreeSet<Ticket>,
}

impl SyncStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket and mark it in flight.
    pub fn begin(&mut self) -> Ticket {
        self.next += 1;
        let ticket = Ticket(self.next);
        self.pending.insert(ticket);
        ticket
    }

    /// Mark `ticket` resolved. Returns `false` if it was not in flight.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        self.pending.remove(&ticket)
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        !self.pending.is_empty()
    }

    #[must_use]
    pub fn is_pending(&self, ticket: Ticket) -> bool {
        self.pending.contains(&ticket)
    }
}

/// One remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistRequest {
    /// Reassign scope and order key together.
    MovePosition {
        collection: CollectionKind,
        id: String,
        scope: String,
        key: OrderKey,
    },
    /// Reorder a group within its board.
    ReorderGroup {
        collection: CollectionKind,
        id: String,
        key: OrderKey,
    },
    UpdateSpan { id: TaskId, span: Span },
}

impl PersistRequest {
    /// Id of the entity the request writes.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        match self {
            Self::MovePosition { id, .. } | Self::ReorderGroup { id, .. } => id,
            Self::UpdateSpan { id, .. } => id.as_str(),
        }
    }
}

/// The remote store's write API.
pub trait RemotePersistence {
    fn move_position(
        &self,
        collection: CollectionKind,
        id: &str,
        scope: &str,
        key: &OrderKey,
    ) -> Result<(), PersistError>;

    fn reorder_group(
        &self,
        collection: CollectionKind,
        id: &str,
        key: &OrderKey,
    ) -> Result<(), PersistError>;

    fn update_span(&self, id: &TaskId, span: Span) -> Result<(), PersistError>;
}

/// Remote work produced by one gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistCommand {
    pub ticket: Ticket,
    pub requests: Vec<PersistRequest>,
}

impl PersistCommand {
    /// Run the requests in order, stopping at the first failure.
    pub fn execute(&self, backend: &dyn RemotePersistence) -> Result<(), PersistError> {
        for request in &self.requests {
            debug!(ticket = %self.ticket, entity = request.entity_id(), "persisting");
            match request {
                PersistRequest::MovePosition {
                    collection,
                    id,
                    scope,
                    key,
                } => backend.move_position(*collection, id, scope, key)?,
                PersistRequest::ReorderGroup {
                    collection,
                    id,
                    key,
                } => backend.reorder_group(*collection, id, key)?,
                PersistRequest::UpdateSpan { id, span } => backend.update_span(id, *span)?,
            }
        }
        Ok(())
    }
}
