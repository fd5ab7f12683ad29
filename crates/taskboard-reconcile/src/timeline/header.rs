#![forbid(unsafe_code)]

//! Virtualized date header.
//!
//! The timeline's horizontal axis is one column per calendar day. Only the
//! days intersecting the viewport, plus a small buffer on each side, are
//! rendered. [`DateHeader::window`] computes that slice the way a scrollback
//! viewport computes its render region: a visible range, then a buffered
//! range clamped to the content.
//!
//! Before the first layout the viewport dimensions are unknown. Rendering
//! nothing would leave the header blank, so an unknown (or zero) dimension
//! falls back to the full range.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use taskboard_core::{MS_PER_DAY, Span, Timestamp};

use crate::config::TimelineConfig;

/// An inclusive range of calendar days (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Range from `a` to `b` inclusive, in either order.
    #[must_use]
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// The days a span touches, widened by `padding_days` on both sides.
    #[must_use]
    pub fn around(span: Span, padding_days: u32) -> Option<Self> {
        let start = DateTime::<Utc>::from_timestamp_millis(span.start)?.date_naive();
        let end = DateTime::<Utc>::from_timestamp_millis(span.end)?.date_naive();
        let pad = Days::new(u64::from(padding_days));
        Some(Self::new(
            start.checked_sub_days(pad).unwrap_or(start),
            end.checked_add_days(pad).unwrap_or(end),
        ))
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days, both ends included.
    #[must_use]
    pub fn day_count(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    /// The `index`-th day of the range.
    #[must_use]
    pub fn day(&self, index: usize) -> Option<NaiveDate> {
        if index >= self.day_count() {
            return None;
        }
        self.start.checked_add_days(Days::new(index as u64))
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Same range with `days` more at the front.
    #[must_use]
    pub fn extended_backward(&self, days: u32) -> Self {
        Self {
            start: self
                .start
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(self.start),
            end: self.end,
        }
    }

    /// Same range with `days` more at the back.
    #[must_use]
    pub fn extended_forward(&self, days: u32) -> Self {
        Self {
            start: self.start,
            end: self
                .end
                .checked_add_days(Days::new(u64::from(days)))
                .unwrap_or(self.end),
        }
    }

    /// Total content width.
    #[must_use]
    pub fn width_px(&self, px_per_day: f64) -> f64 {
        self.day_count() as f64 * px_per_day
    }

    /// Horizontal position of `ts` measured from the start of the range.
    #[must_use]
    pub fn offset_px(&self, ts: Timestamp, px_per_day: f64) -> f64 {
        let origin = self.start.and_time(chrono::NaiveTime::MIN).and_utc();
        let delta_ms = ts - origin.timestamp_millis();
        delta_ms as f64 / MS_PER_DAY as f64 * px_per_day
    }

    /// `(left, width)` of a bar drawn for `span`.
    #[must_use]
    pub fn span_px(&self, span: Span, px_per_day: f64) -> (f64, f64) {
        let left = self.offset_px(span.start, px_per_day);
        let right = self.offset_px(span.end, px_per_day);
        (left, (right - left).max(0.0))
    }
}

/// Pixel viewport of the scroll container; `None` before layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_left: Option<f64>,
    pub width: Option<f64>,
}

impl Viewport {
    /// Dimensions not measured yet.
    pub const UNKNOWN: Self = Self {
        scroll_left: None,
        width: None,
    };

    #[must_use]
    pub const fn new(scroll_left: f64, width: f64) -> Self {
        Self {
            scroll_left: Some(scroll_left),
            width: Some(width),
        }
    }

    fn measured(&self) -> Option<(f64, f64)> {
        match (self.scroll_left, self.width) {
            (Some(left), Some(width)) if left.is_finite() && width.is_finite() && width > 0.0 => {
                Some((left.max(0.0), width))
            }
            _ => None,
        }
    }
}

/// Which day indices to render for one frame. Ends are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderWindow {
    pub total_days: usize,
    /// First day intersecting the viewport.
    pub viewport_start: usize,
    pub viewport_end: usize,
    /// First day to render, buffer included.
    pub render_start: usize,
    pub render_end: usize,
    /// `true` when the viewport was unknown and every day is rendered.
    pub full_range: bool,
}

impl HeaderWindow {
    #[must_use]
    pub fn render_len(&self) -> usize {
        self.render_end.saturating_sub(self.render_start)
    }
}

/// One rendered header cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderDay {
    pub index: usize,
    pub date: NaiveDate,
    pub offset_px: f64,
    pub width_px: f64,
    pub is_weekend: bool,
    pub is_month_start: bool,
}

/// Computes the header cells to render for a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateHeader {
    px_per_day: f64,
    buffer_days: usize,
}

impl Default for DateHeader {
    fn default() -> Self {
        Self::new(&TimelineConfig::default())
    }
}

impl DateHeader {
    #[must_use]
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            px_per_day: config.px_per_day,
            buffer_days: config.header_buffer_days as usize,
        }
    }

    #[must_use]
    pub fn px_per_day(&self) -> f64 {
        self.px_per_day
    }

    #[must_use]
    pub fn window(&self, range: &DateRange, viewport: Viewport) -> HeaderWindow {
        let total = range.day_count();
        let measured = viewport
            .measured()
            .filter(|_| self.px_per_day.is_finite() && self.px_per_day > 0.0);
        let Some((left, width)) = measured else {
            return HeaderWindow {
                total_days: total,
                viewport_start: 0,
                viewport_end: total,
                render_start: 0,
                render_end: total,
                full_range: true,
            };
        };

        let viewport_start = ((left / self.px_per_day).floor() as usize).min(total);
        let viewport_end = (((left + width) / self.px_per_day).ceil() as usize)
            .clamp(viewport_start, total);
        HeaderWindow {
            total_days: total,
            viewport_start,
            viewport_end,
            render_start: viewport_start.saturating_sub(self.buffer_days),
            render_end: viewport_end.saturating_add(self.buffer_days).min(total),
            full_range: false,
        }
    }

    /// Header cells for the buffered window.
    #[must_use]
    pub fn days(&self, range: &DateRange, viewport: Viewport) -> Vec<HeaderDay> {
        let window = self.window(range, viewport);
        (window.render_start..window.render_end)
            .filter_map(|index| {
                let date = range.day(index)?;
                Some(HeaderDay {
                    index,
                    date,
                    offset_px: index as f64 * self.px_per_day,
                    width_px: self.px_per_day,
                    is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
                    is_month_start: date.day() == 1,
                })
            })
            .collect()
    }
}
