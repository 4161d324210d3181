//! Text rendering of transferred bytes.

use std::io::{self, Write};

/// How each byte is shown on the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// The byte itself, unchanged
    #[default]
    Byte,
    /// `0x41 `
    Hex,
    /// `0065 `
    Decimal,
    /// `01000001 `
    Binary,
}

pub fn render_byte<W: Write>(out: &mut W, mode: DisplayMode, byte: u8) -> io::Result<()> {
    match mode {
        DisplayMode::Byte => out.write_all(&[byte]),
        DisplayMode::Hex => write!(out, "{:#04x} ", byte),
        DisplayMode::Decimal => write!(out, "{:04} ", byte),
        DisplayMode::Binary => write!(out, "{:08b} ", byte),
    }
}

/// Renders a byte stream onto a sink, breaking the line every
/// `break_every` bytes (never when zero). The break position follows the
/// running count across calls, not packet boundaries.
pub struct Renderer<W> {
    out: W,
    mode: DisplayMode,
    break_every: usize,
    count: u64,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, mode: DisplayMode, break_every: usize) -> Self {
        Self {
            out,
            mode,
            break_every,
            count: 0,
        }
    }

    pub fn push(&mut self, byte: u8) -> io::Result<()> {
        render_byte(&mut self.out, self.mode, byte)?;
        self.count += 1;
        if self.break_every != 0 && self.count % self.break_every as u64 == 0 {
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn push_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        bytes.iter().try_for_each(|&b| self.push(b))
    }

    /// Bytes rendered so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
