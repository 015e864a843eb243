#![forbid(unsafe_code)]
//! Shared identifiers, error taxonomy and result alias.

use std::fmt;

use serde::Serialize;

/// Identifier of a page (article or redirect) within one graph snapshot.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct PageId(pub u32);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for PageId {
    fn from(value: u32) -> Self {
        PageId(value)
    }
}

impl From<PageId> for u32 {
    fn from(value: PageId) -> Self {
        value.0
    }
}

/// Errors raised while encoding, decoding or indexing page records.
#[derive(thiserror::Error, Debug)]
pub enum WikiError {
    /// Underlying I/O failure.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// A record's declared offsets or lengths disagree with its enclosing buffer.
    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord {
        /// Byte offset of the record inside the buffer being decoded.
        offset: u64,
        /// What was inconsistent.
        reason: &'static str,
    },
    /// The file's leading magic number is not the one this reader understands.
    #[error("version {found:#x} did not match the expected {expected:#x}")]
    InvalidVersion {
        /// Magic number this build writes and reads.
        expected: i32,
        /// Magic number found in the input.
        found: i32,
    },
    /// A value does not fit its fixed-width header field.
    #[error("{field} of {len} exceeds the encodable maximum {max}")]
    EncodingOverflow {
        /// Header field that overflowed.
        field: &'static str,
        /// Requested length.
        len: usize,
        /// Largest encodable length.
        max: usize,
    },
    /// The input ended before the promised number of records was read.
    #[error("stream promised {expected} records but ended after {found}")]
    TruncatedStream {
        /// Record count declared in the header.
        expected: u64,
        /// Records decoded before the input ran out.
        found: u64,
    },
    /// Two records share one id.
    #[error("duplicate page id {0}")]
    DuplicateId(PageId),
    /// The flattened adjacency array would not be addressable.
    #[error("adjacency index of {0} entries exceeds addressable size")]
    IndexOverflow(u64),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

/// Result alias for fallible graph operations.
pub type Result<T> = std::result::Result<T, WikiError>;

/// Expected, non-fatal outcomes of a route query that did not produce a path.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// One or both endpoints are not pages of the graph. Each `Some` names a missing title.
    #[error("{}", describe_missing(.start.as_deref(), .end.as_deref()))]
    EndpointNotFound {
        /// Missing starting title, if the start was not found.
        start: Option<String>,
        /// Missing end title, if the end was not found.
        end: Option<String>,
    },
    /// Both endpoints exist but no chain of links connects them.
    #[error("no route found between \"{start}\" and \"{end}\"")]
    NoRouteFound {
        /// Starting title.
        start: String,
        /// End title.
        end: String,
    },
}

impl RouteError {
    /// Returns true when the starting endpoint was missing.
    pub fn start_missing(&self) -> bool {
        matches!(self, RouteError::EndpointNotFound { start: Some(_), .. })
    }

    /// Returns true when the end endpoint was missing.
    pub fn end_missing(&self) -> bool {
        matches!(self, RouteError::EndpointNotFound { end: Some(_), .. })
    }
}

fn describe_missing(start: Option<&str>, end: Option<&str>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => {
            format!("starting point \"{start}\" and end point \"{end}\" do not exist")
        }
        (Some(start), None) => format!("starting point \"{start}\" does not exist"),
        (None, Some(end)) => format!("end point \"{end}\" does not exist"),
        (None, None) => "endpoint missing".to_string(),
    }
}
