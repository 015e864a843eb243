//! Shortest link routes through a Wikipedia dump.
//!
//! Pages are stored as compact binary records, flattened into forward and reverse adjacency
//! arrays, and queried with a memory-bounded bidirectional breadth-first search.
//!
//! ```no_run
//! use wikiroute::query::{RouteOptions, WikiGraph};
//! use wikiroute::storage::ReadOptions;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = WikiGraph::open("fi.wikiroute", &ReadOptions::default(), RouteOptions::default())?;
//! let route = graph.find_route("Helsinki", "Sauna")?;
//! println!("{route} ({} hops)", route.hops());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod primitives;
pub mod query;
pub mod storage;
pub mod types;

pub use query::{RouteOptions, RoutePath, WikiGraph};
pub use types::{PageId, RouteError, WikiError};
