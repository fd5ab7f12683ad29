#![forbid(unsafe_code)]

//! Bounded log of rollback records for in-flight writes.
//!
//! Every optimistic write that is waiting on the backend leaves one record,
//! keyed by its [`Ticket`]. Several writes may be in flight at once, and
//! they resolve in any order, so the log is a ticket-indexed queue rather
//! than a stack.
//!
//! # Architecture
//!
//! ```text
//! push(t3)
//! ┌──────────────────────────────────────────┐
//! │ Pending:  [t1, t2, t3]                    │
//! └──────────────────────────────────────────┘
//!
//! take(t2)  (write rejected or confirmed)
//! ┌──────────────────────────────────────────┐
//! │ Pending:  [t1, t3]                        │
//! └──────────────────────────────────────────┘
//!
//! push(t4) with max_depth = 2: t1 evicted
//! ┌──────────────────────────────────────────┐
//! │ Pending:  [t3, t4]                        │
//! └──────────────────────────────────────────┘
//! ```
//!
//! An evicted record can no longer be rolled back; the next authoritative
//! snapshot corrects the cache instead.
//!
//! # Invariants
//!
//! 1. `len() <= max_depth` after any operation.
//! 2. Records are kept in push order; eviction removes the oldest.
//! 3. `take` returns each record at most once.

use std::collections::VecDeque;
use std::fmt;

use tracing::warn;

use crate::persistence::Ticket;

/// Ticket-keyed rollback records.
pub struct RollbackLog<R> {
    records: VecDeque<(Ticket, R)>,
    max_depth: usize,
}

impl<R> fmt::Debug for RollbackLog<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackLog")
            .field("pending", &self.records.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<R> RollbackLog<R> {
    /// A log holding at most `max_depth` records (at least one).
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Record a rollback for `ticket`; returns the ticket evicted to stay
    /// within the depth limit, if any.
    pub fn push(&mut self, ticket: Ticket, record: R) -> Option<Ticket> {
        self.records.push_back((ticket, record));
        self.enforce_depth()
    }

    /// Remove and return the record for `ticket`.
    pub fn take(&mut self, ticket: Ticket) -> Option<R> {
        let index = self.records.iter().position(|(t, _)| *t == ticket)?;
        self.records.remove(index).map(|(_, record)| record)
    }

    #[must_use]
    pub fn contains(&self, ticket: Ticket) -> bool {
        self.records.iter().any(|(t, _)| *t == ticket)
    }

    /// Pending tickets, oldest first.
    pub fn tickets(&self) -> impl Iterator<Item = Ticket> + '_ {
        self.records.iter().map(|(t, _)| *t)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn enforce_depth(&mut self) -> Option<Ticket> {
        let mut evicted = None;
        while self.records.len() > self.max_depth {
            if let Some((ticket, _)) = self.records.pop_front() {
                warn!(ticket = %ticket, "rollback record evicted before completion");
                evicted = Some(ticket);
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u64) -> Ticket {
        Ticket::new(n)
    }

    #[test]
    fn new_log_is_empty() {
        let log = RollbackLog::<u8>::new(4);
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert_eq!(log.max_depth(), 4);
    }

    #[test]
    fn take_in_any_order() {
        let mut log = RollbackLog::new(8);
        log.push(t(1), "a");
        log.push(t(2), "b");
        log.push(t(3), "c");
        assert_eq!(log.take(t(2)), Some("b"));
        assert_eq!(log.take(t(2)), None);
        assert_eq!(log.tickets().collect::<Vec<_>>(), [t(1), t(3)]);
    }

    #[test]
    fn depth_limit_evicts_oldest() {
        let mut log = RollbackLog::new(2);
        assert_eq!(log.push(t(1), 1), None);
        assert_eq!(log.push(t(2), 2), None);
        assert_eq!(log.push(t(3), 3), Some(t(1)));
        assert!(!log.contains(t(1)));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn zero_depth_is_clamped_to_one() {
        let mut log = RollbackLog::new(0);
        log.push(t(1), ());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let mut log = RollbackLog::new(4);
        log.push(t(1), ());
        log.push(t(2), ());
        log.clear();
        assert!(log.is_empty());
    }
}
