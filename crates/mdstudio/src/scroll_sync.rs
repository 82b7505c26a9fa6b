//! Proportional scroll synchronization between the editor and preview panes.

use serde::{Deserialize, Serialize};

/// Scroll state of one viewport at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub scroll_offset: f64,
    pub content_extent: f64,
    pub viewport_extent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub content_extent: f64,
    pub viewport_extent: f64,
}

impl ScrollSample {
    pub fn new(scroll_offset: f64, content_extent: f64, viewport_extent: f64) -> Self {
        Self {
            scroll_offset,
            content_extent,
            viewport_extent,
        }
    }

    pub fn extents(&self) -> Extents {
        Extents {
            content_extent: self.content_extent,
            viewport_extent: self.viewport_extent,
        }
    }
}

/// How far through its scrollable range a viewport is, in `[0, 1]`.
pub fn scroll_ratio(sample: &ScrollSample) -> f64 {
    let range = sample.content_extent - sample.viewport_extent;
    if range <= 0.0 || range.is_nan() {
        return 0.0;
    }
    let ratio = sample.scroll_offset / range.max(1.0);
    if ratio.is_nan() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0)
}

/// Scroll offset for `target` that matches the driving viewport's ratio.
pub fn sync(driving: &ScrollSample, target: &Extents) -> f64 {
    let target_range = (target.content_extent - target.viewport_extent).max(0.0);
    scroll_ratio(driving) * target_range
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    EditorDrivesPreview,
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Editor,
    Preview,
}

impl Pane {
    pub fn other(self) -> Pane {
        match self {
            Pane::Editor => Pane::Preview,
            Pane::Preview => Pane::Editor,
        }
    }
}

/// Decides which scroll events drive the other pane.
///
/// Offsets applied programmatically must not be fed back in as scroll
/// events, otherwise bidirectional mode would bounce between the panes.
#[derive(Debug, Clone)]
pub struct ScrollSynchronizer {
    mode: SyncMode,
}

impl ScrollSynchronizer {
    pub fn new(mode: SyncMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Handle a scroll event from `source`. Returns the offset to apply to
    /// the other pane, or `None` when this event must not drive it.
    pub fn on_scroll(&self, source: Pane, sample: &ScrollSample, target: &Extents) -> Option<f64> {
        match (source, self.mode) {
            (Pane::Preview, SyncMode::EditorDrivesPreview) => None,
            _ => Some(sync(sample, target)),
        }
    }
}

impl Default for ScrollSynchronizer {
    fn default() -> Self {
        Self::new(SyncMode::EditorDrivesPreview)
    }
}
