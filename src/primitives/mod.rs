//! Low-level building blocks for the record format.
//!
//! Includes fixed-width byte helpers and the windowed byte sources readers map files through.

/// Byte-level utilities and encoding/decoding.
///
/// Little-endian integer helpers and a bounds-checked read cursor.
pub mod bytes;

/// Windowed byte sources.
///
/// In-memory and memory-mapped sources that hand out bounded shared windows.
pub mod io;
