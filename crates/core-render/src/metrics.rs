//! Render path metrics.
//!
//! Counts which redraw strategy each frame took and how many rows were
//! actually touched, so the log can explain a slow terminal.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RenderPathMetrics {
    /// Erase-and-redraw frames (first frame, geometry change).
    pub full_frames: AtomicU64,
    /// As-is repaints (scroll, refresh, head shift).
    pub repaint_frames: AtomicU64,
    /// Diff frames that patched rows in place.
    pub diff_frames: AtomicU64,
    /// Rows printed with their highlighted rendering.
    pub rows_highlighted: AtomicU64,
    /// Rows printed plain.
    pub rows_plain: AtomicU64,
    /// Rows left untouched by a diff pass.
    pub rows_skipped: AtomicU64,
    /// Duration (ns) of the most recent render.
    pub last_render_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderPathMetricsSnapshot {
    pub full_frames: u64,
    pub repaint_frames: u64,
    pub diff_frames: u64,
    pub rows_highlighted: u64,
    pub rows_plain: u64,
    pub rows_skipped: u64,
    pub last_render_ns: u64,
}

impl RenderPathMetrics {
    pub fn snapshot(&self) -> RenderPathMetricsSnapshot {
        RenderPathMetricsSnapshot {
            full_frames: self.full_frames.load(Ordering::Relaxed),
            repaint_frames: self.repaint_frames.load(Ordering::Relaxed),
            diff_frames: self.diff_frames.load(Ordering::Relaxed),
            rows_highlighted: self.rows_highlighted.load(Ordering::Relaxed),
            rows_plain: self.rows_plain.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            last_render_ns: self.last_render_ns.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}
