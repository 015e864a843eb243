//! Shortest link routes by breadth-first search.
//!
//! The bidirectional search grows one frontier from the start over out-links and one from the
//! end over in-links, popping a single id per side per round. A side whose predecessor map grows
//! past the frontier limit pauses while the other side keeps expanding; when both are over the
//! limit they alternate again. The limit bounds memory only: path length stays minimal because
//! the join is chosen among every id both sides have discovered.

use std::collections::hash_map::Entry;
use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::storage::AdjacencyIndex;
use crate::types::PageId;

/// Default predecessor-map size past which a frontier counts as too big.
pub const DEFAULT_FRONTIER_LIMIT: usize = 1 << 18;
const INITIAL_CAPACITY: usize = 1 << 12;

/// Tuning for route queries.
#[derive(Clone, Debug)]
pub struct RouteOptions {
    /// Predecessor-map size past which a frontier pauses in favour of the other side.
    pub frontier_limit: usize,
    /// Search from both ends using the reverse index.
    pub bidirectional: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            frontier_limit: DEFAULT_FRONTIER_LIMIT,
            bidirectional: true,
        }
    }
}

impl RouteOptions {
    /// Sets the frontier limit.
    pub fn frontier_limit(mut self, limit: usize) -> Self {
        self.frontier_limit = limit;
        self
    }

    /// Enables or disables the bidirectional search.
    pub fn bidirectional(mut self, enabled: bool) -> Self {
        self.bidirectional = enabled;
        self
    }
}

type Predecessors = FxHashMap<u32, u32>;

enum Search {
    Found(u32),
    Exhausted,
}

enum Step {
    Met(u32),
    Expanded,
}

struct Frontier<'i> {
    index: &'i AdjacencyIndex,
    prev: Predecessors,
    queue: VecDeque<u32>,
    too_big: bool,
    side: &'static str,
}

impl<'i> Frontier<'i> {
    fn seeded(index: &'i AdjacencyIndex, root: u32, side: &'static str) -> Self {
        let mut prev = Predecessors::default();
        prev.reserve(INITIAL_CAPACITY);
        prev.insert(root, root);
        let mut queue = VecDeque::with_capacity(INITIAL_CAPACITY);
        queue.push_back(root);
        Self {
            index,
            prev,
            queue,
            too_big: false,
            side,
        }
    }

    /// Pops one id; reports it as a meeting point if the other side already discovered it,
    /// otherwise records its undiscovered neighbours.
    fn step(&mut self, other: &Predecessors, limit: usize) -> Step {
        let Some(id) = self.queue.pop_front() else {
            return Step::Expanded;
        };
        if other.contains_key(&id) {
            return Step::Met(id);
        }
        expand(self.index, id, &mut self.prev, &mut self.queue);
        if !self.too_big && self.prev.len() > limit {
            self.too_big = true;
            warn!(
                side = self.side,
                discovered = self.prev.len(),
                limit,
                "frontier too big, favouring the other side"
            );
        }
        Step::Expanded
    }
}

fn expand(index: &AdjacencyIndex, id: u32, prev: &mut Predecessors, queue: &mut VecDeque<u32>) {
    for &link in index.links(id) {
        if let Entry::Vacant(slot) = prev.entry(link) {
            slot.insert(id);
            queue.push_back(link);
        }
    }
}

/// Number of steps from `id` back to the root of `prev`.
fn depth(prev: &Predecessors, mut id: u32) -> usize {
    let mut steps = 0;
    while let Some(&parent) = prev.get(&id) {
        if parent == id {
            break;
        }
        id = parent;
        steps += 1;
    }
    steps
}

/// Ids from `id` back to the root of `prev`, `id` first.
fn chain(prev: &Predecessors, mut id: u32) -> Vec<u32> {
    let mut out = vec![id];
    while let Some(&parent) = prev.get(&id) {
        if parent == id {
            break;
        }
        out.push(parent);
        id = parent;
    }
    out
}

/// Finds shortest routes over a forward index and, optionally, its reverse.
///
/// Holds only shared references: any number of finders may query the same indices at once.
#[derive(Clone, Debug)]
pub struct RouteFinder<'a> {
    forward: &'a AdjacencyIndex,
    reverse: Option<&'a AdjacencyIndex>,
    frontier_limit: usize,
}

impl<'a> RouteFinder<'a> {
    /// Creates a finder. Without a reverse index queries fall back to a one-sided search.
    pub fn new(forward: &'a AdjacencyIndex, reverse: Option<&'a AdjacencyIndex>) -> Self {
        Self {
            forward,
            reverse,
            frontier_limit: DEFAULT_FRONTIER_LIMIT,
        }
    }

    /// Sets the frontier limit.
    pub fn frontier_limit(mut self, limit: usize) -> Self {
        self.frontier_limit = limit;
        self
    }

    /// Shortest route from `start` to `end`, both included.
    ///
    /// Returns `[start]` when the endpoints are equal and an empty vector when no route exists.
    pub fn find(&self, start: PageId, end: PageId) -> Vec<PageId> {
        if start == end {
            return vec![start];
        }
        let route = match self.reverse {
            Some(reverse) => self.find_bidirectional(start.0, end.0, reverse),
            None => self.find_unidirectional(start.0, end.0),
        };
        route.into_iter().map(PageId).collect()
    }

    fn find_bidirectional(&self, start: u32, end: u32, reverse: &AdjacencyIndex) -> Vec<u32> {
        let limit = self.frontier_limit;
        let mut forward = Frontier::seeded(self.forward, start, "forward");
        let mut backward = Frontier::seeded(reverse, end, "backward");
        let outcome = loop {
            if forward.queue.is_empty() || backward.queue.is_empty() {
                break Search::Exhausted;
            }
            if !forward.too_big || backward.too_big {
                if let Step::Met(id) = forward.step(&backward.prev, limit) {
                    break Search::Found(id);
                }
            }
            if !backward.too_big || forward.too_big {
                if let Step::Met(id) = backward.step(&forward.prev, limit) {
                    break Search::Found(id);
                }
            }
        };
        debug!(
            start,
            end,
            forward_discovered = forward.prev.len(),
            backward_discovered = backward.prev.len(),
            "bidirectional search finished"
        );
        match outcome {
            Search::Exhausted => Vec::new(),
            Search::Found(first_meeting) => {
                let meeting = best_meeting(&forward.prev, &backward.prev).unwrap_or(first_meeting);
                join(&forward.prev, &backward.prev, meeting)
            }
        }
    }

    fn find_unidirectional(&self, start: u32, end: u32) -> Vec<u32> {
        let mut prev = Predecessors::default();
        prev.insert(start, start);
        let mut queue = VecDeque::with_capacity(INITIAL_CAPACITY);
        queue.push_back(start);
        while let Some(id) = queue.pop_front() {
            if id == end {
                let mut route = chain(&prev, end);
                route.reverse();
                debug!(start, end, discovered = prev.len(), "search finished");
                return route;
            }
            expand(self.forward, id, &mut prev, &mut queue);
        }
        debug!(start, end, discovered = prev.len(), "search exhausted");
        Vec::new()
    }
}

/// Common id minimising forward plus backward depth; ties go to the lower id.
fn best_meeting(forward: &Predecessors, backward: &Predecessors) -> Option<u32> {
    let (small, large) = if forward.len() <= backward.len() {
        (forward, backward)
    } else {
        (backward, forward)
    };
    small
        .keys()
        .filter(|id| large.contains_key(id))
        .map(|&id| (depth(forward, id) + depth(backward, id), id))
        .min()
        .map(|(_, id)| id)
}

/// Start-to-meeting half followed by the meeting-to-end half, meeting id once.
fn join(forward: &Predecessors, backward: &Predecessors, meeting: u32) -> Vec<u32> {
    let mut route = chain(forward, meeting);
    route.reverse();
    route.extend(chain(backward, meeting).into_iter().skip(1));
    route
}
