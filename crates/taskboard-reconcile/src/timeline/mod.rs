#![forbid(unsafe_code)]

//! Timeline view: span/row reconciliation, the virtualized date header, and
//! range expansion at the scroll edges.

pub mod expansion;
pub mod header;
pub mod reconcile;

pub use expansion::{ExpandDirection, Expansion, RangeExpander, ScrollMetrics};
pub use header::{DateHeader, DateRange, HeaderDay, HeaderWindow, Viewport};
pub use reconcile::{TimelineItem, TimelineProjection, TimelineReconciler, TimelineRow};
