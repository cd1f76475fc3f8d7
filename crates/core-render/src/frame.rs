//! One snapshot of command output with per-line change tracking.

use core_terminal::WindowSize;
use unicode_width::UnicodeWidthChar;

const TAB_STOP: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw lines in display order (split on `\n`, never mutated).
    pub lines: Vec<String>,
    /// `lines[i]` truncated to the terminal width at construction time.
    pub display: Vec<String>,
    /// Ticks remaining in the highlight decay window (see `diff`).
    pub streak: Vec<usize>,
    /// Cached colorized rendering, valid while `streak[i] > 1`.
    pub highlighted: Vec<String>,
    /// `min(lines.len(), rows - 1)`.
    pub visible_height: usize,
    /// Column width the display lines were truncated to.
    pub width: u16,
}

impl Frame {
    pub fn new(text: &str, size: WindowSize) -> Self {
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let display = lines
            .iter()
            .map(|l| truncate_to_width(l, usize::from(size.cols)))
            .collect();
        let len = lines.len();
        Self {
            display,
            streak: vec![0; len],
            highlighted: vec![String::new(); len],
            visible_height: len.min(size.content_rows()),
            width: size.cols,
            lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether a screen drawn for `self` can be patched in place for `other`.
    pub fn same_geometry(&self, other: &Frame) -> bool {
        self.visible_height == other.visible_height && self.width == other.width
    }

    /// Rebuild display state for a new terminal size, keeping change tracking.
    pub fn relayout(&mut self, size: WindowSize) {
        if size.cols != self.width {
            self.display = self
                .lines
                .iter()
                .map(|l| truncate_to_width(l, usize::from(size.cols)))
                .collect();
            self.width = size.cols;
            // Cached highlights were built from the old truncation.
            for (streak, hl) in self.streak.iter_mut().zip(self.highlighted.iter_mut()) {
                *streak = 0;
                hl.clear();
            }
        }
        self.visible_height = self.len().min(size.content_rows());
    }
}

/// Truncate `line` so it occupies at most `cols` terminal columns. Never
/// splits a character; tabs advance to the next multiple of eight.
pub fn truncate_to_width(line: &str, cols: usize) -> String {
    let mut used = 0usize;
    for (idx, ch) in line.char_indices() {
        let next = if ch == '\t' {
            (used / TAB_STOP + 1) * TAB_STOP
        } else {
            used + ch.width().unwrap_or(0)
        };
        if next > cols {
            return line[..idx].to_string();
        }
        used = next;
    }
    line.to_string()
}
