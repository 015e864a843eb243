//! Flat id-indexed adjacency arrays.
//!
//! Every page contributes one block `[id, count, target_0 .. target_{count-1}]` to a single
//! contiguous `u32` array; a hash index maps each id to the start of its block. The reverse index
//! has the same shape with every edge inverted.

use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::info;

use super::store::PageStore;
use crate::types::{PageId, Result, WikiError};

const BLOCK_HEADER: usize = 2;

/// Which way the edges of an index point.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Dir {
    /// Source page to link target.
    Out,
    /// Link target back to the linking page.
    In,
}

/// Flattened adjacency of every page in one direction.
#[derive(Clone, Debug)]
pub struct AdjacencyIndex {
    dir: Dir,
    links: Vec<u32>,
    offsets: FxHashMap<u32, usize>,
    edges: u64,
}

fn checked_len(blocks: u64, edges: u64) -> Result<usize> {
    let len = blocks
        .checked_mul(BLOCK_HEADER as u64)
        .and_then(|header| header.checked_add(edges))
        .ok_or(WikiError::IndexOverflow(u64::MAX))?;
    usize::try_from(len).map_err(|_| WikiError::IndexOverflow(len))
}

impl AdjacencyIndex {
    /// Builds the forward index from the id view of `store`.
    pub fn forward(store: &PageStore) -> Result<Self> {
        let started = Instant::now();
        let edges: u64 = store.pages().iter().map(|p| p.link_count() as u64).sum();
        let mut links = Vec::with_capacity(checked_len(store.len() as u64, edges)?);
        let mut offsets = FxHashMap::default();
        offsets.reserve(store.len());
        for page in store.iter_by_id() {
            let id = page.id().0;
            offsets.insert(id, links.len());
            links.push(id);
            links.push(page.link_count() as u32);
            page.for_each_link(|target| links.push(target.0));
        }
        info!(
            blocks = offsets.len(),
            edges,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "forward adjacency built"
        );
        Ok(Self {
            dir: Dir::Out,
            links,
            offsets,
            edges,
        })
    }

    /// Builds the index of inverted edges.
    ///
    /// Counts in-degrees first, lays out one exactly-sized block per distinct target, then fills
    /// the blocks in a second scan, using each block's count slot as its fill cursor.
    pub fn reverse(&self) -> Result<Self> {
        let started = Instant::now();
        let mut in_degree: FxHashMap<u32, u64> = FxHashMap::default();
        for (_, targets) in self.blocks() {
            for &target in targets {
                *in_degree.entry(target).or_default() += 1;
            }
        }
        let mut targets: Vec<(u32, u64)> = in_degree.into_iter().collect();
        targets.sort_unstable_by_key(|&(id, _)| id);

        let mut links = vec![0u32; checked_len(targets.len() as u64, self.edges)?];
        let mut offsets = FxHashMap::default();
        offsets.reserve(targets.len());
        let mut cursor = 0usize;
        for (target, count) in targets {
            if count > u32::MAX as u64 {
                return Err(WikiError::IndexOverflow(count));
            }
            offsets.insert(target, cursor);
            links[cursor] = target;
            links[cursor + 1] = 0;
            cursor += BLOCK_HEADER + count as usize;
        }

        for (source, targets) in self.blocks() {
            for &target in targets {
                let start = *offsets
                    .get(&target)
                    .ok_or(WikiError::Invalid("reverse block missing for target"))?;
                let written = links[start + 1];
                links[start + BLOCK_HEADER + written as usize] = source.0;
                links[start + 1] = written + 1;
            }
        }
        info!(
            blocks = offsets.len(),
            edges = self.edges,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reverse adjacency built"
        );
        Ok(Self {
            dir: Dir::In,
            links,
            offsets,
            edges: self.edges,
        })
    }

    /// Direction of the stored edges.
    pub fn dir(&self) -> Dir {
        self.dir
    }

    /// Neighbours of `id`; empty for ids without a block.
    #[inline]
    pub fn links(&self, id: u32) -> &[u32] {
        let Some(&start) = self.offsets.get(&id) else {
            return &[];
        };
        let count = self.links.get(start + 1).copied().unwrap_or(0) as usize;
        let first = start + BLOCK_HEADER;
        self.links.get(first..first + count).unwrap_or(&[])
    }

    /// Visits the neighbours of `id`.
    pub fn for_each_link_index(&self, id: u32, mut visit: impl FnMut(u32)) {
        for &link in self.links(id) {
            visit(link);
        }
    }

    /// Whether `id` has a block.
    pub fn contains(&self, id: u32) -> bool {
        self.offsets.contains_key(&id)
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.offsets.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> u64 {
        self.edges
    }

    /// Length of the flat array, in entries.
    pub fn flat_len(&self) -> usize {
        self.links.len()
    }

    /// Walks the flat array block by block.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            links: &self.links,
            pos: 0,
        }
    }
}

/// Iterator over `(id, neighbours)` blocks in array order.
#[derive(Clone, Debug)]
pub struct Blocks<'a> {
    links: &'a [u32],
    pos: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = (PageId, &'a [u32]);

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.links.get(self.pos)?;
        let count = *self.links.get(self.pos + 1)? as usize;
        let first = self.pos + BLOCK_HEADER;
        let end = (first + count).min(self.links.len());
        self.pos = end;
        Some((PageId(id), &self.links[first..end]))
    }
}
