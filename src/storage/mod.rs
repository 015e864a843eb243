//! Page records and the structures derived from them.
//!
//! Records are flyweights over shared buffers; the store orders them by title and id, the
//! serializer moves them to and from disk, and the adjacency indices flatten their links.

/// Forward and reverse flat adjacency arrays.
pub mod adjacency;

/// Compact binary page record.
pub mod record;

/// Versioned container format with in-memory, windowed and streaming readers.
pub mod ser;

/// Title- and id-ordered page collection.
pub mod store;

pub use adjacency::{AdjacencyIndex, Blocks, Dir};
pub use record::{PageRecord, PageRef, RecordHeader, MAX_LINKS, MAX_TITLE_LEN, RECORD_HEADER_SIZE};
pub use ser::{ReadOptions, DEFAULT_WINDOW_BYTES, MAGIC_VERSION};
pub use store::{sort_if_needed, PageStore, ViewSorts};
