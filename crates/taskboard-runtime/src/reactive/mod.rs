#![forbid(unsafe_code)]

//! Reactive primitives for cache-to-view propagation.

pub mod observable;

pub use observable::{Observable, ObserverGuard};
