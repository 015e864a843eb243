#![forbid(unsafe_code)]

//! Command-line support: config file handling and page-table import/export.
//!
//! The `wikiroute` binary is a thin layer over these modules and [`crate::query::WikiGraph`].

/// TOML configuration for the command-line tool.
///
/// Supplies a default graph path and route/read tuning that flags can override.
pub mod config;

/// Page-table import and export.
///
/// Converts CSV or TSV tables with `id,title,redirect,links` columns to serialized graphs and
/// back.
pub mod import_export;
