#![forbid(unsafe_code)]
//! Fixed-width integer encoding and a bounds-checked cursor shared by the record and file layers.

pub mod buf;
pub mod le;
