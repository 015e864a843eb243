//! A loaded link graph: pages plus the indices route queries run over.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::route::{RouteFinder, RouteOptions};
use crate::storage::ser::{self, ReadOptions};
use crate::storage::{AdjacencyIndex, PageRecord, PageStore};
use crate::types::{PageId, Result, RouteError};

/// Immutable graph snapshot.
///
/// Built once, then shared freely: every query allocates its own search state, so a `&WikiGraph`
/// can serve any number of threads without locking.
#[derive(Debug)]
pub struct WikiGraph {
    store: PageStore,
    forward: AdjacencyIndex,
    reverse: Option<AdjacencyIndex>,
    options: RouteOptions,
}

/// One page on a route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteHop {
    /// Page id.
    pub id: PageId,
    /// Page title.
    pub title: String,
}

/// A shortest route between two pages.
#[derive(Clone, Debug, Serialize)]
pub struct RoutePath {
    /// Pages from start to end, both included.
    pub pages: Vec<RouteHop>,
    /// Wall-clock query time in microseconds.
    pub elapsed_us: u64,
}

impl RoutePath {
    /// Number of links followed; zero when start and end coincide.
    pub fn hops(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    /// Titles along the route.
    pub fn titles(&self) -> impl Iterator<Item = &str> + '_ {
        self.pages.iter().map(|hop| hop.title.as_str())
    }

    /// Time the query took.
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, title) in self.titles().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "\"{title}\"")?;
        }
        Ok(())
    }
}

/// Sizes of a loaded graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Pages, redirects included.
    pub pages: usize,
    /// Pages flagged as redirects.
    pub redirects: usize,
    /// Links across all pages, dangling ones included.
    pub links: u64,
    /// Blocks in the forward index.
    pub forward_blocks: usize,
    /// Blocks in the reverse index, zero when it was not built.
    pub reverse_blocks: usize,
    /// Entries in the reverse index's flat array.
    pub reverse_entries: usize,
    /// Largest page id, `None` for an empty graph.
    pub largest_id: Option<PageId>,
    /// Most links held by a single page.
    pub max_links: usize,
    /// Title bytes summed over all pages.
    pub title_bytes: u64,
    /// Longest title, in bytes.
    pub longest_title: usize,
}

impl WikiGraph {
    /// Builds a graph over `pages` with default route options.
    pub fn new(pages: Vec<PageRecord>) -> Result<Self> {
        Self::with_options(pages, RouteOptions::default())
    }

    /// Builds a graph over `pages`. The reverse index is only built for bidirectional search.
    pub fn with_options(pages: Vec<PageRecord>, options: RouteOptions) -> Result<Self> {
        Self::from_store(PageStore::new(pages)?, options)
    }

    /// Builds the indices over an existing store.
    pub fn from_store(store: PageStore, options: RouteOptions) -> Result<Self> {
        let started = Instant::now();
        let forward = AdjacencyIndex::forward(&store)?;
        let reverse = if options.bidirectional {
            Some(forward.reverse()?)
        } else {
            None
        };
        info!(
            pages = store.len(),
            edges = forward.edge_count(),
            bidirectional = options.bidirectional,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "graph ready"
        );
        Ok(Self {
            store,
            forward,
            reverse,
            options,
        })
    }

    /// Loads a serialized graph from `path` through bounded memory-mapped windows.
    pub fn open(
        path: impl AsRef<Path>,
        read: &ReadOptions,
        options: RouteOptions,
    ) -> Result<Self> {
        let pages = ser::open(path, read)?;
        Self::with_options(pages, options)
    }

    /// Loads a serialized graph from a forward-only stream such as stdin.
    pub fn load(reader: impl Read, options: RouteOptions) -> Result<Self> {
        Self::with_options(ser::load(reader)?, options)
    }

    /// Pages of the graph.
    pub fn store(&self) -> &PageStore {
        &self.store
    }

    /// Forward adjacency.
    pub fn forward(&self) -> &AdjacencyIndex {
        &self.forward
    }

    /// Reverse adjacency, if built.
    pub fn reverse(&self) -> Option<&AdjacencyIndex> {
        self.reverse.as_ref()
    }

    /// Options queries run with.
    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    fn finder(&self) -> RouteFinder<'_> {
        RouteFinder::new(&self.forward, self.reverse.as_ref())
            .frontier_limit(self.options.frontier_limit)
    }

    /// Shortest route between two titles.
    pub fn find_route(&self, start: &str, end: &str) -> std::result::Result<RoutePath, RouteError> {
        let started = Instant::now();
        let from = self.store.page_by_title(start).map(PageRecord::id);
        let to = self.store.page_by_title(end).map(PageRecord::id);
        let (Some(from), Some(to)) = (from, to) else {
            return Err(RouteError::EndpointNotFound {
                start: from.is_none().then(|| start.to_string()),
                end: to.is_none().then(|| end.to_string()),
            });
        };
        let path = self.route_between(from, to, started).ok_or_else(|| RouteError::NoRouteFound {
            start: start.to_string(),
            end: end.to_string(),
        })?;
        debug!(start, end, hops = path.hops(), elapsed_us = path.elapsed_us, "route found");
        Ok(path)
    }

    fn route_between(&self, from: PageId, to: PageId, started: Instant) -> Option<RoutePath> {
        let ids = self.route_ids(from, to);
        if ids.is_empty() {
            return None;
        }
        let pages = ids
            .into_iter()
            .map(|id| RouteHop {
                id,
                title: self.title_of(id),
            })
            .collect();
        Some(RoutePath {
            pages,
            elapsed_us: started.elapsed().as_micros() as u64,
        })
    }

    /// Route between two distinct, uniformly chosen pages.
    ///
    /// `None` for an empty graph. A single-page graph yields the zero-hop route to itself.
    pub fn random_route(&self) -> Option<std::result::Result<RoutePath, RouteError>> {
        self.random_route_with(&mut rand::thread_rng())
    }

    /// Like [`Self::random_route`] with a caller-supplied generator.
    pub fn random_route_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Option<std::result::Result<RoutePath, RouteError>> {
        let started = Instant::now();
        let count = self.store.len();
        let (start, end) = match count {
            0 => return None,
            1 => (0, 0),
            _ => {
                let start = rng.gen_range(0..count);
                let mut end = rng.gen_range(0..count - 1);
                if end >= start {
                    end += 1;
                }
                (start, end)
            }
        };
        let start = self.store.get(start)?;
        let end = self.store.get(end)?;
        let route = self
            .route_between(start.id(), end.id(), started)
            .ok_or_else(|| RouteError::NoRouteFound {
                start: start.title().into_owned(),
                end: end.title().into_owned(),
            });
        Some(route)
    }

    /// Shortest route between two ids; empty when none exists.
    pub fn route_ids(&self, start: PageId, end: PageId) -> Vec<PageId> {
        self.finder().find(start, end)
    }

    /// Runs independent queries concurrently, results in input order.
    pub fn find_routes<S: AsRef<str> + Sync>(
        &self,
        pairs: &[(S, S)],
    ) -> Vec<std::result::Result<RoutePath, RouteError>> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(pairs.len())
            .max(1);
        let chunk = pairs.len().div_ceil(workers).max(1);
        thread::scope(|scope| {
            let handles: Vec<_> = pairs
                .chunks(chunk)
                .map(|batch| {
                    scope.spawn(move || {
                        batch
                            .iter()
                            .map(|(start, end)| self.find_route(start.as_ref(), end.as_ref()))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    /// Whether a page titled `title` exists.
    pub fn has_page(&self, title: &str) -> bool {
        self.store.find_by_title(title).is_some()
    }

    /// Titles starting with `prefix`, at most `max`.
    pub fn find_prefix_matches(&self, prefix: &str, max: usize) -> Vec<String> {
        self.store.find_prefix_matches(prefix, max)
    }

    /// Titles of the pages `title` links to, in stored order. Dangling links are skipped.
    ///
    /// `None` when no page has that title.
    pub fn list_links(&self, title: &str) -> Option<Vec<String>> {
        let page = self.store.page_by_title(title)?;
        Some(
            page.links()
                .filter_map(|id| self.store.page_by_id(id))
                .map(|target| target.title().into_owned())
                .collect(),
        )
    }

    /// A uniformly chosen title.
    pub fn random_title(&self) -> Option<String> {
        self.store.random_title()
    }

    /// Sizes of the graph and its indices.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            pages: self.store.len(),
            redirects: 0,
            links: self.forward.edge_count(),
            forward_blocks: self.forward.block_count(),
            reverse_blocks: self.reverse.as_ref().map_or(0, AdjacencyIndex::block_count),
            reverse_entries: self.reverse.as_ref().map_or(0, AdjacencyIndex::flat_len),
            largest_id: None,
            max_links: 0,
            title_bytes: 0,
            longest_title: 0,
        };
        for page in self.store.pages() {
            stats.redirects += usize::from(page.is_redirect());
            stats.largest_id = stats.largest_id.max(Some(page.id()));
            stats.max_links = stats.max_links.max(page.link_count());
            stats.title_bytes += page.title_length() as u64;
            stats.longest_title = stats.longest_title.max(page.title_length());
        }
        stats
    }

    fn title_of(&self, id: PageId) -> String {
        self.store
            .page_by_id(id)
            .map(|page| page.title().into_owned())
            .unwrap_or_else(|| id.to_string())
    }
}
