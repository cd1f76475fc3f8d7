//! Terminal writer: batches relative cursor and clear operations for one
//! frame and flushes them in order.
//!
//! All cursor motion is relative to the row the cursor currently sits on;
//! the renderer never addresses absolute screen positions because the
//! output region starts wherever the shell prompt left the cursor.
//!
//! Raw mode disables output post-processing, so a row break is written as
//! `\r\n` rather than a bare newline.

use crossterm::{
    cursor::{MoveToColumn, MoveToNextLine, MoveToPreviousLine},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

pub const ROW_BREAK: &str = "\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Clear the whole current row (`CSI 2K`).
    ClearLine,
    /// Column 1 of the row `n` rows up (`CSI nF`).
    PrevLine(u16),
    /// Column 1 of the row `n` rows down (`CSI nE`).
    NextLine(u16),
    /// Column 1 of the current row (`CSI 1G`).
    Column1,
    Print(String),
    RowBreak,
}

#[derive(Debug, Default)]
pub struct Writer {
    cmds: Vec<Command>,
}

impl Writer {
    pub fn new() -> Self {
        Self { cmds: Vec::new() }
    }

    pub fn clear_line(&mut self) {
        self.cmds.push(Command::ClearLine);
    }

    pub fn prev_line(&mut self, n: u16) {
        if n > 0 {
            self.cmds.push(Command::PrevLine(n));
        }
    }

    pub fn next_line(&mut self, n: u16) {
        if n > 0 {
            self.cmds.push(Command::NextLine(n));
        }
    }

    pub fn column1(&mut self) {
        self.cmds.push(Command::Column1);
    }

    pub fn print<S: Into<String>>(&mut self, s: S) {
        let s: String = s.into();
        if !s.is_empty() {
            self.cmds.push(Command::Print(s));
        }
    }

    pub fn row_break(&mut self) {
        self.cmds.push(Command::RowBreak);
    }

    /// Clear the `height` rows ending at the cursor, leaving the cursor at
    /// column 1 of the topmost one.
    pub fn erase_up(&mut self, height: usize) {
        match height {
            0 => {}
            1 => {
                self.clear_line();
                self.column1();
            }
            _ => {
                for _ in 1..height {
                    self.clear_line();
                    self.prev_line(1);
                }
                self.clear_line();
            }
        }
    }

    /// Move from the last row of a `height`-row region to column 1 of its
    /// first row without touching content.
    pub fn back_to_top(&mut self, height: usize) {
        match height {
            0 => {}
            1 => self.column1(),
            _ => self.prev_line(clamp_rows(height - 1)),
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.cmds
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn flush_to<W: Write>(self, out: &mut W) -> io::Result<()> {
        for c in self.cmds {
            match c {
                Command::ClearLine => queue!(out, Clear(ClearType::CurrentLine))?,
                Command::PrevLine(n) => queue!(out, MoveToPreviousLine(n))?,
                Command::NextLine(n) => queue!(out, MoveToNextLine(n))?,
                Command::Column1 => queue!(out, MoveToColumn(0))?,
                Command::Print(s) => queue!(out, Print(s))?,
                Command::RowBreak => queue!(out, Print(ROW_BREAK))?,
            }
        }
        out.flush()
    }
}

fn clamp_rows(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
