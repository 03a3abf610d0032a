//! Caret-following viewport
//!
//! Keeps the caret inside the visible part of the text area as the text
//! grows. The caret's vertical position is derived from its line index and
//! the effective line height; the viewport only moves when the caret gets
//! within the margin (two lines by default) of the top or bottom edge, so
//! ordinary typing in the middle of the view never fights the user's scroll.

use crate::config::ViewportConfig;
use crate::model::Selection;
use crate::services::time_source::SharedTimeSource;
use std::time::{Duration, Instant};

/// Computed style of the text area. Unknown values are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    pub line_height: Option<f64>,
    pub font_size: Option<f64>,
    pub padding_top: f64,
    pub padding_bottom: f64,
}

/// Geometry and scroll position of the text area and its line-number gutter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Viewport {
    pub metrics: FontMetrics,
    /// Visible height in pixels
    pub client_height: f64,
    /// Scrollable content height reported by the host (0 if unknown)
    pub scroll_height: f64,
    pub scroll_top: f64,
    /// Kept equal to `scroll_top` so line numbers stay aligned
    pub gutter_scroll_top: f64,
    /// User asked the platform for reduced motion
    pub reduced_motion: bool,
}

impl Viewport {
    pub fn new(client_height: f64, scroll_height: f64) -> Self {
        Self {
            client_height,
            scroll_height,
            ..Self::default()
        }
    }

    /// Move both the text area and the gutter
    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top;
        self.gutter_scroll_top = scroll_top;
    }
}

/// How the host should animate a scroll adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAdjustment {
    pub from: f64,
    pub to: f64,
    pub behavior: ScrollBehavior,
}

#[derive(Debug)]
pub struct ViewportFollower {
    config: ViewportConfig,
    time: SharedTimeSource,
    last_auto_scroll: Option<Instant>,
}

impl ViewportFollower {
    pub fn new(config: ViewportConfig, time: SharedTimeSource) -> Self {
        Self {
            config,
            time,
            last_auto_scroll: None,
        }
    }

    /// Line height from computed metrics, then font size, then the fallback
    pub fn line_height(&self, metrics: &FontMetrics) -> f64 {
        let usable = |v: &f64| v.is_finite() && *v > 0.0;
        if let Some(lh) = metrics.line_height.filter(usable) {
            return lh;
        }
        if let Some(fs) = metrics.font_size.filter(usable) {
            return fs * self.config.font_size_line_ratio;
        }
        self.config.fallback_line_height
    }

    /// Height of `text` laid out one line per newline, including padding
    pub fn content_height(&self, metrics: &FontMetrics, text: &str) -> f64 {
        let lines = text.matches('\n').count() + 1;
        metrics.padding_top + lines as f64 * self.line_height(metrics) + metrics.padding_bottom
    }

    /// Scroll `viewport` so the caret at byte offset `caret` stays at least the
    /// margin away from both edges.
    ///
    /// Returns the applied adjustment, or `None` when the caret was already
    /// comfortably visible.
    pub fn ensure_caret_visible(
        &mut self,
        viewport: &mut Viewport,
        text: &str,
        caret: usize,
        prefer_smooth: bool,
    ) -> Option<ScrollAdjustment> {
        let caret = Selection::caret(caret).clamped_to(text).end;
        let line_height = self.line_height(&viewport.metrics);
        let line_index = text[..caret].matches('\n').count();

        let caret_top = viewport.metrics.padding_top + line_index as f64 * line_height;
        let caret_bottom = caret_top + line_height;
        let visible_top = viewport.scroll_top;
        let visible_bottom = visible_top + viewport.client_height;
        let margin = line_height * self.config.margin_lines;

        let mut target = visible_top;
        if caret_top < visible_top + margin {
            target = caret_top - margin;
        } else if caret_bottom > visible_bottom - margin {
            target = caret_bottom - (viewport.client_height - margin);
        }

        let scrollable = viewport
            .scroll_height
            .max(self.content_height(&viewport.metrics, text));
        let max_scroll_top = (scrollable - viewport.client_height).max(0.0);
        target = target.clamp(0.0, max_scroll_top);

        if (target - visible_top).abs() < 1.0 {
            return None;
        }

        let now = self.time.now();
        let interval = Duration::from_millis(self.config.smooth_scroll_interval_ms);
        let quiet = self
            .last_auto_scroll
            .is_none_or(|last| now.saturating_duration_since(last) > interval);
        let behavior = if prefer_smooth && !viewport.reduced_motion && quiet {
            ScrollBehavior::Smooth
        } else {
            ScrollBehavior::Instant
        };
        self.last_auto_scroll = Some(now);

        viewport.set_scroll_top(target);
        tracing::trace!(
            "Auto-scroll {:.1} -> {:.1} ({:?}) for caret line {}",
            visible_top,
            target,
            behavior,
            line_index
        );

        Some(ScrollAdjustment {
            from: visible_top,
            to: target,
            behavior,
        })
    }
}
