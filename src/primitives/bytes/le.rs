//! Little-endian fixed-width integers, the single byte order of the graph file.

use core::convert::TryInto;

/// Width of an encoded `i16`.
pub const I16_LEN: usize = core::mem::size_of::<i16>();
/// Width of an encoded `i32`.
pub const I32_LEN: usize = core::mem::size_of::<i32>();
/// Width of an encoded `i64`.
pub const I64_LEN: usize = core::mem::size_of::<i64>();

/// Appends an `i16`.
pub fn put_i16(dst: &mut Vec<u8>, v: i16) {
    dst.extend_from_slice(&v.to_le_bytes());
}

/// Appends an `i32`.
pub fn put_i32(dst: &mut Vec<u8>, v: i32) {
    dst.extend_from_slice(&v.to_le_bytes());
}

/// Appends an `i64`.
pub fn put_i64(dst: &mut Vec<u8>, v: i64) {
    dst.extend_from_slice(&v.to_le_bytes());
}

/// Reads an `i16` at `off`, or `None` if the slice is too short.
#[inline]
pub fn get_i16(src: &[u8], off: usize) -> Option<i16> {
    let end = off.checked_add(I16_LEN)?;
    let bytes: [u8; I16_LEN] = src.get(off..end)?.try_into().ok()?;
    Some(i16::from_le_bytes(bytes))
}

/// Reads an `i32` at `off`, or `None` if the slice is too short.
#[inline]
pub fn get_i32(src: &[u8], off: usize) -> Option<i32> {
    let end = off.checked_add(I32_LEN)?;
    let bytes: [u8; I32_LEN] = src.get(off..end)?.try_into().ok()?;
    Some(i32::from_le_bytes(bytes))
}

/// Reads an `i64` at `off`, or `None` if the slice is too short.
#[inline]
pub fn get_i64(src: &[u8], off: usize) -> Option<i64> {
    let end = off.checked_add(I64_LEN)?;
    let bytes: [u8; I64_LEN] = src.get(off..end)?.try_into().ok()?;
    Some(i64::from_le_bytes(bytes))
}
