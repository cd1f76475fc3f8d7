//! Positional change tracking and the per-row redraw decision.
//!
//! Streak life cycle for one line with `count_max = 3`:
//!
//! ```text
//! streak  4       3  2  1      0  0 ...
//! action  colour  -  -  plain  -  - ...
//! ```
//!
//! A changed line is drawn highlighted on the tick it changes, left alone
//! while the highlight ages, and redrawn plain once when the streak reaches
//! one. Lines that have settled (streak zero) are never touched.

use crate::{Frame, HighlightPolicy, highlight_line};

/// What the diff pass does with one visible row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePolicy {
    /// Leave the row as it is on screen; only move the cursor.
    Skip,
    /// Clear the row and print the display text without colour.
    RedrawPlain,
    /// Clear the row and print the cached highlighted rendering.
    RedrawHighlighted,
}

/// Compare `next` with `prev` position by position and fill in `next`'s
/// streak and highlight cache. Returns the number of changed lines.
pub fn track_changes(prev: &Frame, next: &mut Frame, policy: &HighlightPolicy) -> usize {
    let fresh = policy.fresh_streak();
    let mut changed = 0;
    for i in 0..next.len() {
        let old_line = prev.lines.get(i);
        if old_line == Some(&next.lines[i]) {
            let streak = prev.streak[i].saturating_sub(1);
            next.streak[i] = streak;
            if streak > 1 {
                next.highlighted[i].clone_from(&prev.highlighted[i]);
            }
        } else {
            let old_display = prev.display.get(i).map(String::as_str).unwrap_or("");
            next.highlighted[i] = highlight_line(old_display, &next.display[i], &policy.palette);
            next.streak[i] = fresh;
            changed += 1;
        }
    }
    changed
}

/// Row decision for a diff pass.
pub fn line_policy(streak: usize, count_max: usize) -> LinePolicy {
    if streak == count_max.saturating_add(1) && count_max > 0 {
        LinePolicy::RedrawHighlighted
    } else if streak == 1 {
        LinePolicy::RedrawPlain
    } else {
        LinePolicy::Skip
    }
}

/// Row decision when repainting the whole region from cached state, e.g.
/// after scrolling: lines still inside their window keep their colour.
pub fn repaint_policy(streak: usize) -> LinePolicy {
    if streak > 1 {
        LinePolicy::RedrawHighlighted
    } else {
        LinePolicy::RedrawPlain
    }
}
