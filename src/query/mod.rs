#![forbid(unsafe_code)]

//! Route queries over a loaded link graph.
//!
//! [`route`] holds the breadth-first search itself; [`graph`] wraps the store and both adjacency
//! indices behind the title-level API.

/// Graph facade translating titles to ids and routes back to titles.
pub mod graph;

/// Bidirectional and one-sided breadth-first route search.
pub mod route;

pub use graph::{GraphStats, RouteHop, RoutePath, WikiGraph};
pub use route::{RouteFinder, RouteOptions, DEFAULT_FRONTIER_LIMIT};
