//! Compact page record: a fixed header followed by link ids and title bytes.
//!
//! ```text
//! 0   i32 id              (negated for redirects)
//! 4   i16 link_count
//! 6   i32 links_offset    (relative to record start)
//! 10  i16 title_len
//! 12  i32 title_offset    (relative to record start)
//! 16  [link_count x i32]  link target ids
//! ..  [title_len x u8]    UTF-8 title
//! ```
//!
//! [`PageRef`] reads fields straight out of a borrowed slice; [`PageRecord`] is the owned handle
//! that keeps a reference-counted window of a shared buffer alive.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::io;

use bytes::Bytes;

use crate::primitives::bytes::le;
use crate::types::{PageId, Result, WikiError};

/// Size of the fixed record header.
pub const RECORD_HEADER_SIZE: usize = 16;
/// Largest number of links one record can hold.
pub const MAX_LINKS: usize = i16::MAX as usize;
/// Largest title, in bytes, one record can hold.
pub const MAX_TITLE_LEN: usize = i16::MAX as usize;
/// Upper bound on the encoded size of any record.
pub const MAX_RECORD_LEN: usize = RECORD_HEADER_SIZE + MAX_LINKS * le::I32_LEN + MAX_TITLE_LEN;

mod field {
    pub const ID: usize = 0;
    pub const LINK_COUNT: usize = 4;
    pub const LINKS_OFFSET: usize = 6;
    pub const TITLE_LEN: usize = 10;
    pub const TITLE_OFFSET: usize = 12;
}

/// Decoded fixed-size header of a record.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RecordHeader {
    /// Raw id field; negative for redirects.
    pub raw_id: i32,
    /// Number of link ids.
    pub link_count: u16,
    /// Offset of the link section from the record start.
    pub links_offset: u32,
    /// Title length in bytes.
    pub title_len: u16,
    /// Offset of the title section from the record start.
    pub title_offset: u32,
}

impl RecordHeader {
    /// Builds the header for a record with the given payload sizes.
    fn for_payload(raw_id: i32, link_count: usize, title_len: usize) -> Result<Self> {
        if link_count > MAX_LINKS {
            return Err(WikiError::EncodingOverflow {
                field: "link count",
                len: link_count,
                max: MAX_LINKS,
            });
        }
        if title_len > MAX_TITLE_LEN {
            return Err(WikiError::EncodingOverflow {
                field: "title length",
                len: title_len,
                max: MAX_TITLE_LEN,
            });
        }
        let links_offset = RECORD_HEADER_SIZE as u32;
        Ok(Self {
            raw_id,
            link_count: link_count as u16,
            links_offset,
            title_len: title_len as u16,
            title_offset: links_offset + (link_count * le::I32_LEN) as u32,
        })
    }

    /// Decodes and validates the header found at `offset` of `buf`.
    ///
    /// Returns `Ok(None)` when fewer than [`RECORD_HEADER_SIZE`] bytes remain, which lets windowed
    /// readers tell "continues in the next window" apart from corruption.
    pub fn peek(buf: &[u8], offset: usize) -> Result<Option<Self>> {
        let Some(head) = offset
            .checked_add(RECORD_HEADER_SIZE)
            .and_then(|end| buf.get(offset..end))
        else {
            return Ok(None);
        };
        let corrupt = |reason| WikiError::CorruptRecord {
            offset: offset as u64,
            reason,
        };
        let raw_id = le::get_i32(head, field::ID).ok_or(corrupt("short id"))?;
        let link_count = le::get_i16(head, field::LINK_COUNT).ok_or(corrupt("short link count"))?;
        let links_offset = le::get_i32(head, field::LINKS_OFFSET).ok_or(corrupt("short offset"))?;
        let title_len = le::get_i16(head, field::TITLE_LEN).ok_or(corrupt("short title length"))?;
        let title_offset = le::get_i32(head, field::TITLE_OFFSET).ok_or(corrupt("short offset"))?;
        if raw_id == i32::MIN {
            return Err(corrupt("id out of range"));
        }
        if link_count < 0 || title_len < 0 {
            return Err(corrupt("negative length"));
        }
        let header = Self {
            raw_id,
            link_count: link_count as u16,
            links_offset: links_offset as u32,
            title_len: title_len as u16,
            title_offset: title_offset as u32,
        };
        if links_offset as usize != RECORD_HEADER_SIZE || links_offset < 0 {
            return Err(corrupt("link section does not follow header"));
        }
        if title_offset < 0 || title_offset as usize != header.title_start_expected() {
            return Err(corrupt("title section does not follow links"));
        }
        Ok(Some(header))
    }

    fn title_start_expected(&self) -> usize {
        RECORD_HEADER_SIZE + self.link_count as usize * le::I32_LEN
    }

    /// Total encoded size of the record described by this header.
    pub fn record_len(&self) -> usize {
        self.title_offset as usize + self.title_len as usize
    }

    /// Appends the encoded header.
    pub fn write_to(&self, dst: &mut Vec<u8>) {
        le::put_i32(dst, self.raw_id);
        le::put_i16(dst, self.link_count as i16);
        le::put_i32(dst, self.links_offset as i32);
        le::put_i16(dst, self.title_len as i16);
        le::put_i32(dst, self.title_offset as i32);
    }
}

/// Borrowed flyweight over one encoded record.
///
/// The wrapped slice is exactly the record's bytes; every accessor reads from it on demand.
#[derive(Copy, Clone)]
pub struct PageRef<'a> {
    bytes: &'a [u8],
    link_count: usize,
    title_len: usize,
}

impl<'a> PageRef<'a> {
    /// Validates the record at `offset` of `buf` and returns a view over it.
    pub fn parse(buf: &'a [u8], offset: usize) -> Result<Self> {
        let header = RecordHeader::peek(buf, offset)?.ok_or(WikiError::CorruptRecord {
            offset: offset as u64,
            reason: "header truncated",
        })?;
        let bytes = offset
            .checked_add(header.record_len())
            .and_then(|end| buf.get(offset..end))
            .ok_or(WikiError::CorruptRecord {
                offset: offset as u64,
                reason: "payload exceeds buffer",
            })?;
        let links_end = RECORD_HEADER_SIZE + header.link_count as usize * le::I32_LEN;
        let negative = bytes[RECORD_HEADER_SIZE..links_end]
            .chunks_exact(le::I32_LEN)
            .any(|chunk| le::get_i32(chunk, 0).is_some_and(|id| id < 0));
        if negative {
            return Err(WikiError::CorruptRecord {
                offset: offset as u64,
                reason: "negative link id",
            });
        }
        Ok(Self {
            bytes,
            link_count: header.link_count as usize,
            title_len: header.title_len as usize,
        })
    }

    #[inline]
    fn raw_id(&self) -> i32 {
        le::get_i32(self.bytes, field::ID).unwrap_or_default()
    }

    /// Page id, with the redirect tag stripped.
    #[inline]
    pub fn id(&self) -> PageId {
        PageId(self.raw_id().unsigned_abs())
    }

    /// Whether this record is a redirect.
    #[inline]
    pub fn is_redirect(&self) -> bool {
        self.raw_id() < 0
    }

    /// Number of link ids.
    #[inline]
    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Title length in bytes, read without decoding.
    #[inline]
    pub fn title_length(&self) -> usize {
        self.title_len
    }

    /// Raw title bytes.
    #[inline]
    pub fn title_bytes(&self) -> &'a [u8] {
        let start = self.bytes.len() - self.title_len;
        &self.bytes[start..]
    }

    /// Title decoded as UTF-8; invalid sequences are replaced.
    pub fn title(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.title_bytes())
    }

    fn link_bytes(&self) -> &'a [u8] {
        let end = RECORD_HEADER_SIZE + self.link_count * le::I32_LEN;
        &self.bytes[RECORD_HEADER_SIZE..end]
    }

    /// Iterates over link target ids in stored order.
    pub fn links(&self) -> impl ExactSizeIterator<Item = PageId> + 'a {
        self.link_bytes()
            .chunks_exact(le::I32_LEN)
            .map(|chunk| PageId(le::get_i32(chunk, 0).unwrap_or_default() as u32))
    }

    /// Visits every link target id without allocating.
    pub fn for_each_link(&self, mut visit: impl FnMut(PageId)) {
        for link in self.links() {
            visit(link);
        }
    }

    /// Byte-wise title order; a proper prefix sorts before the longer title.
    #[inline]
    pub fn compare_title(&self, other: &PageRef<'_>) -> Ordering {
        self.title_bytes().cmp(other.title_bytes())
    }

    /// Total encoded size of this record.
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    /// The record's encoded bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Writes exactly [`Self::byte_length`] bytes.
    pub fn write_to<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        sink.write_all(self.bytes)
    }
}

impl fmt::Debug for PageRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" ({}{}), {} links",
            self.title(),
            self.id(),
            if self.is_redirect() { ", redirect" } else { "" },
            self.link_count()
        )
    }
}

/// Owned page record backed by a shared, reference-counted buffer.
///
/// Records decoded from a file share the file's buffer (or memory map); cloning only bumps a
/// reference count.
#[derive(Clone, PartialEq, Eq)]
pub struct PageRecord {
    data: Bytes,
}

impl PageRecord {
    /// Encodes a fresh record.
    pub fn encode(id: PageId, links: &[PageId], title: &str, is_redirect: bool) -> Result<Self> {
        if id.0 > i32::MAX as u32 {
            return Err(WikiError::EncodingOverflow {
                field: "page id",
                len: id.0 as usize,
                max: i32::MAX as usize,
            });
        }
        if is_redirect && id.0 == 0 {
            return Err(WikiError::Invalid("redirect pages need a non-zero id"));
        }
        if let Some(link) = links.iter().find(|link| link.0 > i32::MAX as u32) {
            return Err(WikiError::EncodingOverflow {
                field: "link id",
                len: link.0 as usize,
                max: i32::MAX as usize,
            });
        }
        let raw_id = if is_redirect {
            -(id.0 as i32)
        } else {
            id.0 as i32
        };
        let title = title.as_bytes();
        let header = RecordHeader::for_payload(raw_id, links.len(), title.len())?;
        let mut buf = Vec::with_capacity(header.record_len());
        header.write_to(&mut buf);
        for link in links {
            le::put_i32(&mut buf, link.0 as i32);
        }
        buf.extend_from_slice(title);
        debug_assert_eq!(buf.len(), header.record_len());
        Ok(Self { data: buf.into() })
    }

    /// Wraps the record at `offset` of a shared buffer without copying it.
    pub fn from_shared(buf: &Bytes, offset: usize) -> Result<Self> {
        let len = PageRef::parse(buf, offset)?.byte_length();
        Ok(Self {
            data: buf.slice(offset..offset + len),
        })
    }

    /// Borrowed view used by every accessor.
    #[inline]
    pub fn view(&self) -> PageRef<'_> {
        // The buffer was validated when this record was built.
        PageRef {
            bytes: &self.data,
            link_count: le::get_i16(&self.data, field::LINK_COUNT).unwrap_or_default() as usize,
            title_len: le::get_i16(&self.data, field::TITLE_LEN).unwrap_or_default() as usize,
        }
    }

    /// Page id, with the redirect tag stripped.
    pub fn id(&self) -> PageId {
        self.view().id()
    }

    /// Whether this record is a redirect.
    pub fn is_redirect(&self) -> bool {
        self.view().is_redirect()
    }

    /// Title decoded as UTF-8.
    pub fn title(&self) -> Cow<'_, str> {
        self.view().title()
    }

    /// Raw title bytes.
    pub fn title_bytes(&self) -> &[u8] {
        self.view().title_bytes()
    }

    /// Title length in bytes.
    pub fn title_length(&self) -> usize {
        self.view().title_length()
    }

    /// Number of link ids.
    pub fn link_count(&self) -> usize {
        self.view().link_count()
    }

    /// Iterates over link target ids in stored order.
    pub fn links(&self) -> impl ExactSizeIterator<Item = PageId> + '_ {
        self.view().links()
    }

    /// Visits every link target id.
    pub fn for_each_link(&self, visit: impl FnMut(PageId)) {
        self.view().for_each_link(visit)
    }

    /// Byte-wise title order.
    pub fn compare_title(&self, other: &PageRecord) -> Ordering {
        self.view().compare_title(&other.view())
    }

    /// Compares this record's title against raw title bytes.
    pub fn compare_title_to(&self, title: &[u8]) -> Ordering {
        self.title_bytes().cmp(title)
    }

    /// Total encoded size of this record.
    pub fn byte_length(&self) -> usize {
        self.data.len()
    }

    /// The record's encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Writes exactly [`Self::byte_length`] bytes.
    pub fn write_to<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        self.view().write_to(sink)
    }
}

impl fmt::Debug for PageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}
