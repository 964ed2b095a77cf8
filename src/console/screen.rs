//! Software copy of what the terminal shows.
//!
//! The UART has no readable screen, so the console keeps its own grid of
//! cells and a cursor. Writes past the last cell are dropped, never
//! wrapped.

use crate::param::SCREENSIZE;

const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;

/// What to send back to the terminal for one received byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Echo {
    /// Nothing; the byte was discarded.
    Silent,
    /// A printable byte, sent back as is.
    Byte(u8),
    /// CR then LF.
    Newline,
    /// Backspace, space, backspace.
    Erase,
}

impl Echo {
    pub fn transmit(self, mut tx: impl FnMut(u8)) {
        match self {
            Echo::Silent => {}
            Echo::Byte(byte) => tx(byte),
            Echo::Newline => {
                tx(b'\r');
                tx(b'\n');
            }
            Echo::Erase => {
                tx(BACKSPACE);
                tx(b' ');
                tx(BACKSPACE);
            }
        }
    }
}

pub struct ScreenBuffer<const CAP: usize = SCREENSIZE> {
    cells: [u8; CAP],
    cursor: usize,
    width: usize,
}

impl<const CAP: usize> ScreenBuffer<CAP> {
    /// An empty screen with lines `width` cells wide, clamped to
    /// `1..=CAP`.
    pub const fn new(width: usize) -> Self {
        let width = if width > CAP { CAP } else { width };
        Self {
            cells: [b' '; CAP],
            cursor: 0,
            width: if width == 0 { 1 } else { width },
        }
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// Offset of the next cell to be written, `0..=capacity`.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Cells of line `row`, if the screen has that many lines.
    pub fn line(&self, row: usize) -> Option<&[u8]> {
        let start = row.checked_mul(self.width)?;
        if start >= CAP {
            return None;
        }
        let end = (start + self.width).min(CAP);
        Some(&self.cells[start..end])
    }

    pub fn clear(&mut self) {
        self.cells = [b' '; CAP];
        self.cursor = 0;
    }

    /// Moves the cursor to the start of the next line. A cursor already
    /// at a line start stays put.
    pub fn newline(&mut self) {
        let column = self.cursor % self.width;
        if column != 0 {
            self.cursor = (self.cursor + self.width - column).min(CAP);
        }
    }

    /// Steps the cursor back one cell. Returns false at offset 0.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Stores `byte` at the cursor. Returns false once the screen is full.
    pub fn put(&mut self, byte: u8) -> bool {
        match self.cells.get_mut(self.cursor) {
            Some(cell) => {
                *cell = byte;
                self.cursor += 1;
                true
            }
            None => false,
        }
    }

    /// Applies one byte typed at the terminal and says what to echo.
    pub fn accept(&mut self, byte: u8) -> Echo {
        match byte {
            b'\r' | b'\n' => {
                self.newline();
                Echo::Newline
            }
            BACKSPACE | DEL => {
                if self.backspace() {
                    Echo::Erase
                } else {
                    Echo::Silent
                }
            }
            0x20..=0x7e => {
                // echoed even when there is no room left to store it.
                self.put(byte);
                Echo::Byte(byte)
            }
            _ => Echo::Silent,
        }
    }

    /// Records one byte of kernel output.
    pub fn record(&mut self, byte: u8) {
        match byte {
            b'\n' => self.newline(),
            0x20..=0x7e => {
                self.put(byte);
            }
            _ => {}
        }
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new(crate::param::COLUMNS_IN_LINE)
    }
}
