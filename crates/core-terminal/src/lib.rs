//! Terminal backend abstraction and crossterm implementation.
//!
//! topless draws inline (no alternate screen): the backend only toggles raw
//! input mode so keystrokes arrive unbuffered and unechoed. Restoration is
//! idempotent and guaranteed by `TerminalGuard`'s Drop on every exit path,
//! including early returns and panics that unwind.

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use thiserror::Error;

pub mod geometry;
pub mod resize;
pub use geometry::{CrosstermProbe, FixedProbe, GeometryProbe, WindowSize};
pub use resize::ResizeEventSource;

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("terminal i/o failed")]
    Io(#[from] std::io::Error),
    #[error("terminal reports an unusable size ({cols}x{rows})")]
    ZeroSize { cols: u16, rows: u16 },
}

pub type Result<T> = std::result::Result<T, TerminalError>;

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn is_entered(&self) -> bool;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard ensuring terminal state restoration even if caller early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard {
            backend: self,
            active: true,
        })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            self.entered = true;
            tracing::debug!(target: "terminal", "raw_mode_entered");
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            disable_raw_mode()?;
            self.entered = false;
            tracing::debug!(target: "terminal", "raw_mode_restored");
        }
        Ok(())
    }

    fn is_entered(&self) -> bool {
        self.entered
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl TerminalGuard<'_> {
    /// Restore the terminal now instead of at drop, surfacing any error.
    pub fn release(mut self) -> Result<()> {
        self.active = false;
        self.backend.leave()
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}
