#![forbid(unsafe_code)]

//! Observable value with change notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). When the value changes (by `PartialEq`), every live
//! subscriber is notified in registration order. Cache collections use it so
//! a host view can re-render when a snapshot lands or an optimistic write is
//! applied.
//!
//! # Failure Modes
//!
//! - **Subscriber leak**: [`ObserverGuard`]s kept forever keep their
//!   callbacks alive. Dead weak references are pruned lazily on notify.
//! - Subscribers may call `set()` re-entrantly; the borrow is released before
//!   callbacks run.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{trace, trace_span};
use web_time::Instant;

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** state.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Subscribers are notified in registration order.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// `f` must not call `set` on this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value; notifies subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Register a change callback. Dropping the guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> ObserverGuard {
        let strong: CallbackRc<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.inner.borrow_mut().subscribers.push(weak);
        ObserverGuard {
            _guard: Box::new(strong),
        }
    }

    /// Increments by 1 on each value-changing mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    fn notify(&self) {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(|w| w.upgrade())
                .collect()
        };
        if callbacks.is_empty() {
            return;
        }

        let value = self.inner.borrow().value.clone();
        let started = Instant::now();
        let _span = trace_span!("taskboard.notify", subscribers = callbacks.len()).entered();
        for cb in &callbacks {
            cb(&value);
        }
        trace!(
            duration_us = started.elapsed().as_micros() as u64,
            "observable propagation"
        );
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping it drops the strong `Rc`, so the weak entry held by the
/// observable fails to upgrade on the next notification.
pub struct ObserverGuard {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for ObserverGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_set_basic() {
        let obs = Observable::new(42);
        assert_eq!(obs.get(), 42);
        assert_eq!(obs.version(), 0);
        obs.set(99);
        assert_eq!(obs.get(), 99);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn no_change_no_version_bump() {
        let obs = Observable::new(42);
        obs.set(42);
        assert_eq!(obs.version(), 0);
    }

    #[test]
    fn guard_drop_unsubscribes() {
        let obs = Observable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&count);
        let guard = obs.subscribe(move |_| seen.set(seen.get() + 1));
        obs.set(1);
        assert_eq!(count.get(), 1);
        drop(guard);
        obs.set(2);
        assert_eq!(count.get(), 1);
        assert!(obs.inner.borrow().subscribers.is_empty());
    }

    #[test]
    fn notification_order_is_registration_order() {
        let obs = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let l2 = Rc::clone(&log);
        let _a = obs.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let _b = obs.subscribe(move |v| l2.borrow_mut().push(("b", *v)));
        obs.set(7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn reentrant_set_from_subscriber() {
        let obs = Observable::new(0);
        let handle = obs.clone();
        let _g = obs.subscribe(move |v| {
            if *v == 1 {
                handle.set(2);
            }
        });
        obs.set(1);
        assert_eq!(obs.get(), 2);
        assert_eq!(obs.version(), 2);
    }

    #[test]
    fn clone_shares_state() {
        let a = Observable::new(String::from("x"));
        let b = a.clone();
        b.set("y".into());
        assert_eq!(a.get(), "y");
    }
}
