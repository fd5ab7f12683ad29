#![forbid(unsafe_code)]

use thiserror::Error;

use crate::persistence::Ticket;

/// Failure reported by the remote persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the reconciliation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The gesture ended without a usable target. Never returned to the
    /// host by the gesture handlers; they treat it as a cancelled drag.
    #[error("gesture has no valid drop target")]
    ValidationImpossible,

    /// A persisted write failed; the optimistic state was rolled back.
    #[error("persisting {id} was rejected: {source}")]
    PersistenceRejected {
        id: String,
        #[source]
        source: PersistError,
    },

    /// A write failed but its rollback record was already evicted or
    /// consumed; the next authoritative snapshot is the only correction.
    #[error("no rollback recorded for {ticket}: {source}")]
    RollbackUnavailable {
        ticket: Ticket,
        #[source]
        source: PersistError,
    },
}
