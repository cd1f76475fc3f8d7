//! Differential renderer: frames, highlight scan, decay policy, viewport
//! clamp and the screen writer.
//!
//! Rendering model: topless draws inline, starting at whatever row the
//! cursor occupies when the first frame arrives. After every draw the cursor
//! rests on the last drawn row, so the next draw first walks back up
//! (`back to top`) or erases upward (`erase up`) over the previously drawn
//! height before emitting rows again.
//!
//! Per-tick pipeline:
//! 1. `Frame::new` splits command output into lines and truncates each to
//!    the terminal width.
//! 2. `diff::track_changes` compares the new frame positionally with the
//!    previous one, resetting the streak of changed lines and caching their
//!    highlighted rendering.
//! 3. `RenderEngine::render` emits either a full redraw, an as-is repaint,
//!    or a diff pass in which each visible row is redrawn highlighted,
//!    redrawn plain, or skipped according to `diff::line_policy`.
//!
//! Invariants:
//! - `streak`, `highlighted`, `display` and `lines` always have equal length.
//! - Comparison is positional only; no insertion/deletion alignment.
//! - Escape sequences are only emitted at char boundaries.

pub mod diff;
pub mod frame;
pub mod highlight;
pub mod metrics;
pub mod render_engine;
pub mod viewport;
pub mod writer;

pub use diff::{LinePolicy, line_policy, repaint_policy, track_changes};
pub use frame::Frame;
pub use highlight::{HighlightPolicy, highlight_line};
pub use render_engine::{FrameStats, RedrawMode, RenderEngine};
pub use viewport::{Viewport, clamp_head};
