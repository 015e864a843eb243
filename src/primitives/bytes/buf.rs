//! A slice-backed cursor that reports overreads as errors instead of panicking.

use core::fmt;

use super::le;
use crate::types::{Result, WikiError};

/// A cursor for reading little-endian fields from a slice with offset tracking.
pub struct Cursor<'a> {
    /// The underlying byte slice.
    pub buf: &'a [u8],
    /// Current read offset.
    pub off: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor starting at offset 0.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, off: 0 }
    }

    /// Takes the next `n` bytes, advancing the offset.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .off
            .checked_add(n)
            .ok_or(WikiError::Invalid("cursor offset overflow"))?;
        let slice = self.buf.get(self.off..end).ok_or(WikiError::CorruptRecord {
            offset: self.off as u64,
            reason: "read past end of buffer",
        })?;
        self.off = end;
        Ok(slice)
    }

    /// Reads an `i32` and advances.
    pub fn i32(&mut self) -> Result<i32> {
        let at = self.off;
        let bytes = self.take(le::I32_LEN)?;
        le::get_i32(bytes, 0).ok_or(WikiError::CorruptRecord {
            offset: at as u64,
            reason: "short i32",
        })
    }

    /// Reads an `i64` and advances.
    pub fn i64(&mut self) -> Result<i64> {
        let at = self.off;
        let bytes = self.take(le::I64_LEN)?;
        le::get_i64(bytes, 0).ok_or(WikiError::CorruptRecord {
            offset: at as u64,
            reason: "short i64",
        })
    }

    /// Returns the number of bytes remaining in the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.off)
    }
}

impl<'a> fmt::Debug for Cursor<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("off", &self.off)
            .field("remaining", &self.remaining())
            .finish()
    }
}
