//! `core::fmt` sinks for two-pass encoding
//!
//! Output is first written to a [`ByteCounter`] to learn its exact size,
//! then rendered into a buffer of that size through a [`SliceWriter`].

use core::fmt;

/// Counts the bytes written to it without storing them
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteCounter {
    len: usize,
}

impl ByteCounter {
    /// Create a counter at zero
    pub const fn new() -> Self {
        Self { len: 0 }
    }

    /// Bytes counted so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if nothing has been counted
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Write for ByteCounter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.len += s.len();
        Ok(())
    }
}

/// Writes into a fixed byte slice, failing once it is full
#[derive(Debug)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    /// Wrap `buf`, starting at its first byte
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.pos.checked_add(s.len()).ok_or(fmt::Error)?;
        let dest = self.buf.get_mut(self.pos..end).ok_or(fmt::Error)?;
        dest.copy_from_slice(s.as_bytes());
        self.pos = end;
        Ok(())
    }
}
