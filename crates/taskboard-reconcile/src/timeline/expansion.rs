#![forbid(unsafe_code)]

//! Boundless horizontal scrolling.
//!
//! The timeline starts with a finite [`DateRange`]. When the viewport comes
//! within `edge_threshold_px` of either end, [`RangeExpander::on_scroll`]
//! extends the range by `expand_days`. Growing the range at the front shifts
//! every existing column to the right, so the host must add
//! [`Expansion::scroll_adjust_px`] to its scroll position to keep the same
//! days under the pointer.
//!
//! Only one expansion is in flight at a time. Scroll events keep arriving
//! while the host lays out the wider range; they are ignored until
//! [`RangeExpander::finish`] confirms the layout.

use tracing::{debug, trace};

use super::header::DateRange;
use crate::config::TimelineConfig;

/// Which end of the range grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandDirection {
    Backward,
    Forward,
}

/// A range extension the host must lay out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expansion {
    pub direction: ExpandDirection,
    pub days: u32,
    /// Pixels to add to `scroll_left`; zero for forward growth.
    pub scroll_adjust_px: f64,
    /// The range after the extension.
    pub range: DateRange,
}

/// Scroll container measurements at one scroll event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_left: f64,
    pub viewport_width: f64,
    pub content_width: f64,
}

impl ScrollMetrics {
    fn is_scrollable(&self) -> bool {
        self.scroll_left.is_finite()
            && self.viewport_width.is_finite()
            && self.content_width.is_finite()
            && self.content_width > self.viewport_width
    }

    fn distance_to_start(&self) -> f64 {
        self.scroll_left.max(0.0)
    }

    fn distance_to_end(&self) -> f64 {
        (self.content_width - self.scroll_left - self.viewport_width).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct RangeExpander {
    range: DateRange,
    in_flight: bool,
    edge_threshold_px: f64,
    expand_days: u32,
    px_per_day: f64,
}

impl RangeExpander {
    #[must_use]
    pub fn new(range: DateRange, config: &TimelineConfig) -> Self {
        Self {
            range,
            in_flight: false,
            edge_threshold_px: config.edge_threshold_px,
            expand_days: config.expand_days,
            px_per_day: config.px_per_day,
        }
    }

    #[must_use]
    pub fn range(&self) -> &DateRange {
        &self.range
    }

    /// Whether an expansion is waiting for [`finish`](Self::finish).
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Replace the range outright (e.g. a different board was opened).
    pub fn reset(&mut self, range: DateRange) {
        self.range = range;
        self.in_flight = false;
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<Expansion> {
        if self.in_flight {
            trace!("scroll during expansion ignored");
            return None;
        }
        if !metrics.is_scrollable() || self.expand_days == 0 {
            return None;
        }

        let (direction, range, scroll_adjust_px) =
            if metrics.distance_to_start() < self.edge_threshold_px {
                (
                    ExpandDirection::Backward,
                    self.range.extended_backward(self.expand_days),
                    f64::from(self.expand_days) * self.px_per_day,
                )
            } else if metrics.distance_to_end() < self.edge_threshold_px {
                (
                    ExpandDirection::Forward,
                    self.range.extended_forward(self.expand_days),
                    0.0,
                )
            } else {
                return None;
            };

        self.range = range;
        self.in_flight = true;
        debug!(
            ?direction,
            days = self.expand_days,
            start = %range.start(),
            end = %range.end(),
            "timeline range expanded"
        );
        Some(Expansion {
            direction,
            days: self.expand_days,
            scroll_adjust_px,
            range,
        })
    }

    /// The host has laid out the last expansion.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn expander() -> RangeExpander {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        RangeExpander::new(DateRange::new(start, end), &TimelineConfig::default())
    }

    fn metrics(scroll_left: f64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_left,
            viewport_width: 400.0,
            content_width: 1_200.0,
        }
    }

    #[test]
    fn near_start_grows_backward_with_scroll_adjust() {
        let mut x = expander();
        let e = x.on_scroll(metrics(50.0)).unwrap();
        assert_eq!(e.direction, ExpandDirection::Backward);
        assert_eq!(e.days, 7);
        assert_eq!(e.scroll_adjust_px, 7.0 * 40.0);
        assert_eq!(x.range().day_count(), 37);
        assert_eq!(e.range.start(), NaiveDate::from_ymd_opt(2024, 5, 25).unwrap());
    }

    #[test]
    fn near_end_grows_forward_without_adjust() {
        let mut x = expander();
        let e = x.on_scroll(metrics(700.0)).unwrap();
        assert_eq!(e.direction, ExpandDirection::Forward);
        assert_eq!(e.scroll_adjust_px, 0.0);
        assert_eq!(e.range.end(), NaiveDate::from_ymd_opt(2024, 7, 7).unwrap());
    }

    #[test]
    fn middle_does_nothing() {
        let mut x = expander();
        assert_eq!(x.on_scroll(metrics(400.0)), None);
        assert!(!x.is_in_flight());
    }

    #[test]
    fn second_trigger_while_in_flight_is_ignored() {
        let mut x = expander();
        assert!(x.on_scroll(metrics(0.0)).is_some());
        assert!(x.is_in_flight());
        assert_eq!(x.on_scroll(metrics(0.0)), None);
        assert_eq!(x.range().day_count(), 37);

        x.finish();
        assert!(x.on_scroll(metrics(0.0)).is_some());
        assert_eq!(x.range().day_count(), 44);
    }

    #[test]
    fn content_that_fits_never_expands() {
        let mut x = expander();
        let fits = ScrollMetrics {
            scroll_left: 0.0,
            viewport_width: 1_200.0,
            content_width: 1_200.0,
        };
        assert_eq!(x.on_scroll(fits), None);
    }
}
