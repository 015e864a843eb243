//! Versioned container for a packed sequence of page records.
//!
//! ```text
//! i32 magic_version
//! i64 record_count
//! record_count x record        (see `storage::record`)
//! ```
//!
//! Every integer is little-endian. Three readers produce identical records: from a buffer already
//! in memory, from a file mapped in bounded windows, and from a forward-only [`Read`] stream.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use super::record::{PageRecord, RecordHeader, RECORD_HEADER_SIZE};
use crate::primitives::bytes::{buf::Cursor, le};
use crate::primitives::io::{MemorySource, MmapSource, WindowSource};
use crate::types::{Result, WikiError};

/// Magic number identifying this container version.
pub const MAGIC_VERSION: i32 = 0x0082_3891;
/// Size of the container header.
pub const FILE_HEADER_LEN: usize = le::I32_LEN + le::I64_LEN;
/// Default mapping window when reading a file.
pub const DEFAULT_WINDOW_BYTES: usize = 1 << 30;
const STREAM_CHUNK_BYTES: usize = 1 << 20;
/// Records reserved up front by the streaming reader; the header count is not trusted.
const STREAM_INITIAL_RECORDS: usize = 1024;

/// Options for reading a serialized graph.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Largest window mapped at once. Raised automatically for a record that does not fit.
    pub window_bytes: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            window_bytes: DEFAULT_WINDOW_BYTES,
        }
    }
}

impl ReadOptions {
    /// Sets the mapping window size.
    pub fn window_bytes(mut self, bytes: usize) -> Self {
        self.window_bytes = bytes;
        self
    }
}

/// Writes the container header followed by every record, returning the bytes written.
pub fn write_pages<'a, W, I>(sink: &mut W, pages: I) -> Result<u64>
where
    W: Write,
    I: IntoIterator<Item = &'a PageRecord>,
    I::IntoIter: ExactSizeIterator,
{
    let pages = pages.into_iter();
    let count = pages.len();
    let mut header = Vec::with_capacity(FILE_HEADER_LEN);
    le::put_i32(&mut header, MAGIC_VERSION);
    le::put_i64(&mut header, count as i64);
    sink.write_all(&header)?;
    let mut written = header.len() as u64;
    for page in pages {
        page.write_to(sink)?;
        written += page.byte_length() as u64;
    }
    Ok(written)
}

/// Writes `pages` to a new file at `path` and syncs it to disk.
pub fn save(path: impl AsRef<Path>, pages: &[PageRecord]) -> Result<u64> {
    let started = Instant::now();
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    let written = write_pages(&mut writer, pages)?;
    let file = writer.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;
    info!(
        path = %path.as_ref().display(),
        pages = pages.len(),
        bytes = written,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "graph written"
    );
    Ok(written)
}

/// Decodes a graph from a buffer already in memory. Records share `data`.
pub fn read_from_bytes(data: impl Into<Bytes>) -> Result<Vec<PageRecord>> {
    let data = data.into();
    let window = data.len().max(1);
    read_windowed(&MemorySource::new(data), &ReadOptions::default().window_bytes(window))
}

/// Decodes a graph file by mapping it in windows of at most `opts.window_bytes`.
pub fn open(path: impl AsRef<Path>, opts: &ReadOptions) -> Result<Vec<PageRecord>> {
    let started = Instant::now();
    let source = MmapSource::open(path.as_ref())?;
    let pages = read_windowed(&source, opts)?;
    info!(
        path = %path.as_ref().display(),
        pages = pages.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "graph loaded"
    );
    Ok(pages)
}

fn decode_file_header(head: &[u8]) -> Result<u64> {
    let mut cur = Cursor::new(head);
    let found = cur.i32()?;
    if found != MAGIC_VERSION {
        return Err(WikiError::InvalidVersion {
            expected: MAGIC_VERSION,
            found,
        });
    }
    let count = cur.i64()?;
    u64::try_from(count).map_err(|_| WikiError::CorruptRecord {
        offset: le::I32_LEN as u64,
        reason: "negative record count",
    })
}

fn at_base(err: WikiError, base: u64) -> WikiError {
    match err {
        WikiError::CorruptRecord { offset, reason } => WikiError::CorruptRecord {
            offset: base + offset,
            reason,
        },
        other => other,
    }
}

/// Decodes every record from `source`, remapping as the cursor leaves each window.
pub fn read_windowed<S: WindowSource>(source: &S, opts: &ReadOptions) -> Result<Vec<PageRecord>> {
    let total = source.len()?;
    if total < FILE_HEADER_LEN as u64 {
        return Err(WikiError::CorruptRecord {
            offset: 0,
            reason: "file header truncated",
        });
    }
    let expected = decode_file_header(&source.window(0, FILE_HEADER_LEN)?)?;
    let body = total - FILE_HEADER_LEN as u64;
    let capacity = expected.min(body / RECORD_HEADER_SIZE as u64) as usize;
    let mut pages = Vec::with_capacity(capacity);
    let mut pos = FILE_HEADER_LEN as u64;
    let mut window = opts.window_bytes.max(RECORD_HEADER_SIZE);

    while (pages.len() as u64) < expected {
        let remaining = total - pos;
        let len = (window as u64).min(remaining) as usize;
        if len == 0 {
            return Err(WikiError::TruncatedStream {
                expected,
                found: pages.len() as u64,
            });
        }
        let buf = source.window(pos, len)?;
        let mut off = 0usize;
        let mut needed = 0usize;
        while (pages.len() as u64) < expected {
            match RecordHeader::peek(&buf, off).map_err(|err| at_base(err, pos))? {
                Some(header) if off + header.record_len() <= buf.len() => {
                    let page = PageRecord::from_shared(&buf, off).map_err(|err| at_base(err, pos))?;
                    off += page.byte_length();
                    pages.push(page);
                }
                Some(header) => {
                    needed = header.record_len();
                    break;
                }
                None => {
                    needed = RECORD_HEADER_SIZE;
                    break;
                }
            }
        }
        if off == 0 && needed > 0 {
            // The next record straddles the end of this window.
            if len as u64 == remaining {
                return Err(WikiError::TruncatedStream {
                    expected,
                    found: pages.len() as u64,
                });
            }
            debug!(pos, needed, "record larger than window, widening");
            window = window.max(needed);
            continue;
        }
        debug!(pos, consumed = off, records = pages.len(), "window consumed");
        pos += off as u64;
    }
    if pos < total {
        warn!(trailing = total - pos, "ignoring bytes after the last record");
    }
    Ok(pages)
}

fn read_or_truncated<R: Read>(
    reader: &mut R,
    dst: &mut [u8],
    expected: u64,
    found: u64,
) -> Result<()> {
    reader.read_exact(dst).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => WikiError::TruncatedStream { expected, found },
        _ => WikiError::Io(err),
    })
}

/// Decodes a graph from a forward-only stream.
///
/// Records are copied into large shared chunks, so the result does not hold one allocation per
/// record.
pub fn read_stream<R: Read>(mut reader: R) -> Result<Vec<PageRecord>> {
    let started = Instant::now();
    let mut head = [0u8; FILE_HEADER_LEN];
    reader.read_exact(&mut head).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => WikiError::CorruptRecord {
            offset: 0,
            reason: "file header truncated",
        },
        _ => WikiError::Io(err),
    })?;
    let expected = decode_file_header(&head)?;
    let mut pages = Vec::with_capacity(stream_capacity(expected));
    let mut chunk = BytesMut::with_capacity(STREAM_CHUNK_BYTES);
    let mut pos = FILE_HEADER_LEN as u64;
    let mut header = [0u8; RECORD_HEADER_SIZE];
    for found in 0..expected {
        read_or_truncated(&mut reader, &mut header, expected, found)?;
        let record_len = RecordHeader::peek(&header, 0)
            .map_err(|err| at_base(err, pos))?
            .map(|h| h.record_len())
            .unwrap_or(RECORD_HEADER_SIZE);
        if chunk.capacity() < record_len {
            chunk.reserve(record_len.max(STREAM_CHUNK_BYTES));
        }
        chunk.extend_from_slice(&header);
        let body = chunk.len();
        chunk.resize(record_len, 0);
        read_or_truncated(&mut reader, &mut chunk[body..], expected, found)?;
        let record: Bytes = chunk.split().freeze();
        pages.push(PageRecord::from_shared(&record, 0).map_err(|err| at_base(err, pos))?);
        pos += record_len as u64;
    }
    info!(
        pages = pages.len(),
        bytes = pos,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "graph streamed"
    );
    Ok(pages)
}

fn stream_capacity(expected: u64) -> usize {
    usize::try_from(expected).map_or(STREAM_INITIAL_RECORDS, |n| n.min(STREAM_INITIAL_RECORDS))
}

/// Convenience for streaming from any [`io::Read`] behind a buffer.
pub fn load(reader: impl Read) -> Result<Vec<PageRecord>> {
    read_stream(io::BufReader::new(reader))
}
