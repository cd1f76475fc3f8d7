//! Terminal geometry probe.
//!
//! The control loop asks for the current size on every tick and on every
//! resize notification; the answer may change between calls.

use crate::{Result, TerminalError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Rows available for content: one row is always kept in reserve.
    pub fn content_rows(&self) -> usize {
        usize::from(self.rows.saturating_sub(1))
    }
}

pub trait GeometryProbe {
    fn window_size(&self) -> Result<WindowSize>;
}

/// Probe backed by `crossterm::terminal::size` (TIOCGWINSZ on Unix).
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermProbe;

impl GeometryProbe for CrosstermProbe {
    fn window_size(&self) -> Result<WindowSize> {
        let (cols, rows) = crossterm::terminal::size()?;
        if cols == 0 || rows == 0 {
            return Err(TerminalError::ZeroSize { cols, rows });
        }
        Ok(WindowSize::new(rows, cols))
    }
}

/// Probe returning a caller-controlled size. Used by headless runs and tests;
/// the size can be swapped to simulate a resize.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    size: std::sync::Arc<std::sync::Mutex<WindowSize>>,
}

impl FixedProbe {
    pub fn new(size: WindowSize) -> Self {
        Self {
            size: std::sync::Arc::new(std::sync::Mutex::new(size)),
        }
    }

    pub fn set(&self, size: WindowSize) {
        if let Ok(mut slot) = self.size.lock() {
            *slot = size;
        }
    }
}

impl GeometryProbe for FixedProbe {
    fn window_size(&self) -> Result<WindowSize> {
        let size = self
            .size
            .lock()
            .map(|s| *s)
            .map_err(|_| std::io::Error::other("geometry probe lock poisoned"))?;
        if size.cols == 0 || size.rows == 0 {
            return Err(TerminalError::ZeroSize {
                cols: size.cols,
                rows: size.rows,
            });
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_rows_reserves_one_row() {
        assert_eq!(WindowSize::new(24, 80).content_rows(), 23);
        assert_eq!(WindowSize::new(1, 80).content_rows(), 0);
    }

    #[test]
    fn fixed_probe_reports_updates_and_rejects_zero() {
        let probe = FixedProbe::new(WindowSize::new(10, 40));
        assert_eq!(probe.window_size().unwrap(), WindowSize::new(10, 40));
        probe.set(WindowSize::new(12, 50));
        assert_eq!(probe.window_size().unwrap().rows, 12);
        probe.set(WindowSize::new(0, 50));
        assert!(matches!(
            probe.window_size(),
            Err(TerminalError::ZeroSize { rows: 0, cols: 50 })
        ));
    }
}
