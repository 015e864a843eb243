//! Byte sources that hand out bounded, shared windows of a serialized graph.

use std::fs::File;
use std::path::Path;

use bytes::Bytes;
use memmap2::MmapOptions;
use tracing::debug;

use crate::types::{Result, WikiError};

/// Random-access source that can expose `[offset, offset + len)` as a shared buffer.
///
/// Windows are independent: a reader maps one, consumes it and maps the next. Buffers handed out
/// stay valid for as long as any record keeps a reference to them.
pub trait WindowSource {
    /// Total length of the source in bytes.
    fn len(&self) -> Result<u64>;

    /// Returns true if the source is empty.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Exposes `len` bytes starting at `offset`.
    fn window(&self, offset: u64, len: usize) -> Result<Bytes>;
}

fn check_range(offset: u64, len: usize, total: u64) -> Result<()> {
    let end = offset
        .checked_add(len as u64)
        .ok_or(WikiError::Invalid("window offset overflow"))?;
    if end > total {
        return Err(WikiError::Invalid("window extends past end of source"));
    }
    Ok(())
}

/// Source over a buffer that is already in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    /// Wraps an in-memory buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

impl WindowSource for MemorySource {
    fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn window(&self, offset: u64, len: usize) -> Result<Bytes> {
        check_range(offset, len, self.data.len() as u64)?;
        let start = offset as usize;
        Ok(self.data.slice(start..start + len))
    }
}

/// Read-only memory-mapped file, mapped one window at a time.
#[derive(Debug)]
pub struct MmapSource {
    file: File,
    len: u64,
}

impl MmapSource {
    /// Opens `path` for mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl WindowSource for MmapSource {
    fn len(&self) -> Result<u64> {
        Ok(self.len)
    }

    #[allow(unsafe_code)]
    fn window(&self, offset: u64, len: usize) -> Result<Bytes> {
        check_range(offset, len, self.len)?;
        if len == 0 {
            return Ok(Bytes::new());
        }
        debug!(offset, len, "mapping window");
        // SAFETY: the file is opened read-only and graph files are written once and never
        // modified in place while being read.
        let map = unsafe { MmapOptions::new().offset(offset).len(len).map(&self.file)? };
        Ok(Bytes::from_owner(map))
    }
}
