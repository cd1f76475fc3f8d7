//! Viewport: the window of output lines currently on screen.
//!
//! `head` is the index of the first displayed line. It is kept inside
//! `[0, total - visible]` (or zero when everything fits), so the bottom of
//! the output can never scroll above the last screen row.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub head: usize,
}

impl Viewport {
    pub fn new() -> Self {
        Self { head: 0 }
    }

    /// Apply `delta` and clamp. Returns whether `head` moved.
    pub fn scroll(&mut self, delta: isize, total: usize, visible: usize) -> bool {
        let next = clamp_head(total, visible, self.head, delta);
        let moved = next != self.head;
        self.head = next;
        moved
    }

    /// Re-clamp after the line count or height changed. Returns whether
    /// `head` moved.
    pub fn reclamp(&mut self, total: usize, visible: usize) -> bool {
        self.scroll(0, total, visible)
    }

    /// Index range of lines on screen.
    pub fn range(&self, total: usize, visible: usize) -> std::ops::Range<usize> {
        let start = self.head.min(total);
        start..(start + visible).min(total)
    }
}

/// Clamp `head + delta` so that `[head, head + visible)` stays inside
/// `[0, total)`.
pub fn clamp_head(total: usize, visible: usize, head: usize, delta: isize) -> usize {
    if total <= visible {
        return 0;
    }
    let max_head = total - visible;
    head.saturating_add_signed(delta).min(max_head)
}
