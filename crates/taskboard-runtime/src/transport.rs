#![forbid(unsafe_code)]

//! Subscription transport seam.
//!
//! The real-time transport is an external collaborator: "subscribe to a
//! collection query, receive full snapshots, learn about failure". This
//! module defines that contract and the query descriptors the cache layer
//! subscribes with.
//!
//! # Contract
//!
//! 1. Each snapshot carries the **full** current result of the query.
//! 2. After `on_error` fires the subscription is dead; no further callbacks.
//! 3. Dropping (or cancelling) the [`SubscriptionHandle`] unsubscribes. A
//!    transport may still deliver one late callback; the cache ignores it.

use std::fmt;

use taskboard_core::{BoardId, RawDocument, UserId};
use thiserror::Error;

/// A remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Boards,
    Lists,
    Tasks,
    Labels,
    Sprints,
}

impl CollectionKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boards => "boards",
            Self::Lists => "lists",
            Self::Tasks => "tasks",
            Self::Labels => "labels",
            Self::Sprints => "sprints",
        }
    }
}

/// Which documents of a collection a query selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryFilter {
    /// A single document by id.
    Document(String),
    /// Documents whose `boardId` equals the given board.
    Board(BoardId),
    /// Boards owned by the user.
    OwnedBy(UserId),
    /// Boards the user is a member of but does not own.
    SharedWith(UserId),
}

/// Stable identity of one live query; also the cache key of its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryDescriptor {
    pub collection: CollectionKind,
    pub filter: QueryFilter,
}

impl QueryDescriptor {
    #[must_use]
    pub fn board(id: &BoardId) -> Self {
        Self {
            collection: CollectionKind::Boards,
            filter: QueryFilter::Document(id.as_str().to_owned()),
        }
    }

    #[must_use]
    pub fn lists(board: &BoardId) -> Self {
        Self::scoped(CollectionKind::Lists, board)
    }

    #[must_use]
    pub fn tasks(board: &BoardId) -> Self {
        Self::scoped(CollectionKind::Tasks, board)
    }

    #[must_use]
    pub fn labels(board: &BoardId) -> Self {
        Self::scoped(CollectionKind::Labels, board)
    }

    #[must_use]
    pub fn sprints(board: &BoardId) -> Self {
        Self::scoped(CollectionKind::Sprints, board)
    }

    #[must_use]
    pub fn owned_boards(user: &UserId) -> Self {
        Self {
            collection: CollectionKind::Boards,
            filter: QueryFilter::OwnedBy(user.clone()),
        }
    }

    #[must_use]
    pub fn shared_boards(user: &UserId) -> Self {
        Self {
            collection: CollectionKind::Boards,
            filter: QueryFilter::SharedWith(user.clone()),
        }
    }

    fn scoped(collection: CollectionKind, board: &BoardId) -> Self {
        Self {
            collection,
            filter: QueryFilter::Board(board.clone()),
        }
    }
}

impl fmt::Display for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.collection.name();
        match &self.filter {
            QueryFilter::Document(id) => write!(f, "{name}/{id}"),
            QueryFilter::Board(board) => write!(f, "{name}?boardId={board}"),
            QueryFilter::OwnedBy(user) => write!(f, "{name}?ownerId={user}"),
            QueryFilter::SharedWith(user) => write!(f, "{name}?memberIds~{user}"),
        }
    }
}

/// Failure reported by the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection lost")]
    Disconnected,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("transport failure: {0}")]
    Other(String),
}

pub type SnapshotCallback = Box<dyn Fn(Vec<RawDocument>)>;
pub type ErrorCallback = Box<dyn Fn(TransportError)>;

/// A push-based collection subscription API.
pub trait SubscriptionTransport {
    fn subscribe(
        &self,
        query: &QueryDescriptor,
        on_snapshot: SnapshotCallback,
        on_error: ErrorCallback,
    ) -> SubscriptionHandle;
}

/// Unsubscribes when cancelled or dropped.
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl SubscriptionHandle {
    #[must_use]
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to release.
    #[must_use]
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("live", &self.cancel.is_some())
            .finish()
    }
}
