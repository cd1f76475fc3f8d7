//! RenderEngine: turns a tracked `Frame` into terminal output.
//!
//! Three strategies, chosen by the caller:
//! * `Full` erases the previously drawn region and prints every visible row
//!   plain. Used for the first frame and whenever the region height or width
//!   changed, since cached highlights no longer line up with the screen.
//! * `Repaint` reprints every visible row from cached state (highlighted rows
//!   keep their colour). Used after scrolling, refresh and head shifts.
//! * `Diff` walks the region and touches only rows whose decay policy asks
//!   for a redraw; everything else is skipped with a cursor move.
//!
//! After any render the cursor rests on the last drawn row.

use crate::diff::{LinePolicy, line_policy, repaint_policy};
use crate::metrics::{RenderPathMetrics, RenderPathMetricsSnapshot};
use crate::viewport::Viewport;
use crate::writer::{ROW_BREAK, Writer};
use crate::Frame;
use std::io::{self, Write};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawMode {
    Full,
    Repaint,
    Diff,
}

impl RedrawMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedrawMode::Full => "full",
            RedrawMode::Repaint => "repaint",
            RedrawMode::Diff => "diff",
        }
    }
}

/// What one render actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub mode: RedrawMode,
    pub highlighted: usize,
    pub plain: usize,
    pub skipped: usize,
}

impl FrameStats {
    fn new(mode: RedrawMode) -> Self {
        Self {
            mode,
            highlighted: 0,
            plain: 0,
            skipped: 0,
        }
    }
}

#[derive(Debug)]
pub struct RenderEngine {
    count_max: usize,
    /// Rows occupied by the previous render (0 before the first one).
    drawn_height: usize,
    metrics: RenderPathMetrics,
}

impl RenderEngine {
    pub fn new(count_max: usize) -> Self {
        Self {
            count_max,
            drawn_height: 0,
            metrics: RenderPathMetrics::default(),
        }
    }

    pub fn drawn_height(&self) -> usize {
        self.drawn_height
    }

    pub fn metrics_snapshot(&self) -> RenderPathMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn render<W: Write>(
        &mut self,
        out: &mut W,
        frame: &Frame,
        viewport: &Viewport,
        mode: RedrawMode,
    ) -> io::Result<FrameStats> {
        let start = Instant::now();
        let visible = frame.visible_height;
        // A diff pass patches rows in place, which only works over a region of
        // the same height.
        let mode = if mode == RedrawMode::Diff && self.drawn_height != visible {
            RedrawMode::Full
        } else {
            mode
        };
        let rows = viewport.range(frame.len(), visible);
        let last = rows.end.saturating_sub(1);
        let mut stats = FrameStats::new(mode);
        let mut w = Writer::new();

        match mode {
            RedrawMode::Full => w.erase_up(self.drawn_height),
            RedrawMode::Repaint if self.drawn_height != visible => w.erase_up(self.drawn_height),
            RedrawMode::Repaint | RedrawMode::Diff => w.back_to_top(self.drawn_height),
        }

        for i in rows {
            let policy = match mode {
                RedrawMode::Full => LinePolicy::RedrawPlain,
                RedrawMode::Repaint => repaint_policy(frame.streak[i]),
                RedrawMode::Diff => line_policy(frame.streak[i], self.count_max),
            };
            match policy {
                LinePolicy::Skip => {
                    stats.skipped += 1;
                    if i == last {
                        w.column1();
                    } else {
                        w.next_line(1);
                    }
                    continue;
                }
                LinePolicy::RedrawPlain => {
                    stats.plain += 1;
                    w.clear_line();
                    w.print(frame.display[i].as_str());
                }
                LinePolicy::RedrawHighlighted => {
                    stats.highlighted += 1;
                    w.clear_line();
                    w.print(frame.highlighted[i].as_str());
                }
            }
            if i != last {
                w.row_break();
            }
        }

        w.flush_to(out)?;
        self.drawn_height = visible;
        self.record(&stats, start);
        debug!(
            target: "render.engine",
            mode = mode.as_str(),
            visible,
            head = viewport.head,
            highlighted = stats.highlighted,
            plain = stats.plain,
            skipped = stats.skipped,
            "frame_rendered"
        );
        Ok(stats)
    }

    /// Move the cursor below the drawn region so whatever prints next (the
    /// shell prompt, an error message) starts on a fresh row.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.drawn_height > 0 {
            out.write_all(ROW_BREAK.as_bytes())?;
        }
        out.flush()?;
        self.drawn_height = 0;
        Ok(())
    }

    fn record(&self, stats: &FrameStats, start: Instant) {
        let m = &self.metrics;
        let counter = match stats.mode {
            RedrawMode::Full => &m.full_frames,
            RedrawMode::Repaint => &m.repaint_frames,
            RedrawMode::Diff => &m.diff_frames,
        };
        RenderPathMetrics::bump(counter, 1);
        RenderPathMetrics::bump(&m.rows_highlighted, stats.highlighted as u64);
        RenderPathMetrics::bump(&m.rows_plain, stats.plain as u64);
        RenderPathMetrics::bump(&m.rows_skipped, stats.skipped as u64);
        let ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        m.last_render_ns.store(ns, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_terminal::WindowSize;

    fn render(
        engine: &mut RenderEngine,
        frame: &Frame,
        head: usize,
        mode: RedrawMode,
    ) -> (String, FrameStats) {
        let mut out = Vec::new();
        let stats = engine.render(&mut out, frame, &Viewport { head }, mode).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn first_full_frame_prints_rows_without_trailing_break() {
        let mut engine = RenderEngine::new(3);
        let f = Frame::new("a\nb", WindowSize::new(24, 80));
        let (out, stats) = render(&mut engine, &f, 0, RedrawMode::Full);
        assert_eq!(out, "\x1b[2Ka\r\n\x1b[2Kb");
        assert_eq!(stats.plain, 2);
        assert_eq!(engine.drawn_height(), 2);
    }

    #[test]
    fn diff_with_nothing_to_do_only_moves_cursor() {
        let mut engine = RenderEngine::new(3);
        let f = Frame::new("a\nb\nc", WindowSize::new(24, 80));
        render(&mut engine, &f, 0, RedrawMode::Full);
        let (out, stats) = render(&mut engine, &f, 0, RedrawMode::Diff);
        assert_eq!(out, "\x1b[2F\x1b[1E\x1b[1E\x1b[1G");
        assert_eq!(stats.skipped, 3);
    }

    #[test]
    fn diff_height_mismatch_escalates_to_full() {
        let mut engine = RenderEngine::new(3);
        let f = Frame::new("a\nb\nc", WindowSize::new(24, 80));
        render(&mut engine, &f, 0, RedrawMode::Full);
        let g = Frame::new("a", WindowSize::new(24, 80));
        let (out, stats) = render(&mut engine, &g, 0, RedrawMode::Diff);
        assert_eq!(stats.mode, RedrawMode::Full);
        assert!(out.starts_with("\x1b[2K\x1b[1F\x1b[2K\x1b[1F\x1b[2K"));
        assert_eq!(engine.drawn_height(), 1);
        assert_eq!(engine.metrics_snapshot().full_frames, 2);
    }

    #[test]
    fn repaint_uses_cached_highlight_inside_window() {
        let mut engine = RenderEngine::new(3);
        let mut f = Frame::new("a\nb", WindowSize::new(24, 80));
        render(&mut engine, &f, 0, RedrawMode::Full);
        f.streak[1] = 3;
        f.highlighted[1] = "<b>".into();
        let (out, stats) = render(&mut engine, &f, 0, RedrawMode::Repaint);
        assert_eq!(out, "\x1b[1F\x1b[2Ka\r\n\x1b[2K<b>");
        assert_eq!((stats.plain, stats.highlighted), (1, 1));
    }

    #[test]
    fn scrolled_viewport_draws_window_only() {
        let mut engine = RenderEngine::new(3);
        let f = Frame::new("0\n1\n2\n3\n4", WindowSize::new(4, 80));
        let (out, _) = render(&mut engine, &f, 2, RedrawMode::Full);
        assert_eq!(out, "\x1b[2K2\r\n\x1b[2K3\r\n\x1b[2K4");
    }

    #[test]
    fn finish_leaves_cursor_below_region() {
        let mut engine = RenderEngine::new(3);
        let f = Frame::new("a", WindowSize::new(24, 80));
        render(&mut engine, &f, 0, RedrawMode::Full);
        let mut out = Vec::new();
        engine.finish(&mut out).unwrap();
        assert_eq!(out, b"\r\n");
        let mut out = Vec::new();
        engine.finish(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
