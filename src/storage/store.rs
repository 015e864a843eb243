//! Ordered collection of page records with a title view and an id view.

use std::cmp::Ordering;
use std::time::Instant;

use rand::Rng;
use tracing::{debug, info};

use super::record::PageRecord;
use crate::types::{PageId, Result, WikiError};

/// Which views [`PageStore::new`] had to sort.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewSorts {
    /// The title view was out of order.
    pub title: bool,
    /// The id permutation was out of order.
    pub id: bool,
}

impl ViewSorts {
    /// Number of views sorted.
    pub fn count(&self) -> usize {
        usize::from(self.title) + usize::from(self.id)
    }
}

/// Immutable set of pages sorted by title, with a secondary permutation sorted by id.
#[derive(Clone, Debug, Default)]
pub struct PageStore {
    by_title: Vec<PageRecord>,
    by_id: Vec<u32>,
    sorts_on_load: ViewSorts,
}

impl PageStore {
    /// Builds a store, sorting each view only when the input is not already in order.
    ///
    /// Fails with [`WikiError::DuplicateId`] if two records share an id.
    pub fn new(mut pages: Vec<PageRecord>) -> Result<Self> {
        if pages.len() > u32::MAX as usize {
            return Err(WikiError::Invalid("too many pages for one store"));
        }
        let title = sort_if_needed(&mut pages, "title", |a, b| a.compare_title(b));
        let mut by_id: Vec<u32> = (0..pages.len() as u32).collect();
        let id = sort_if_needed(&mut by_id, "id", |&a, &b| {
            pages[a as usize].id().cmp(&pages[b as usize].id())
        });
        let sorts_on_load = ViewSorts { title, id };
        for pair in by_id.windows(2) {
            let id = pages[pair[0] as usize].id();
            if id == pages[pair[1] as usize].id() {
                return Err(WikiError::DuplicateId(id));
            }
        }
        info!(pages = pages.len(), sorts = sorts_on_load.count(), "page store ready");
        Ok(Self {
            by_title: pages,
            by_id,
            sorts_on_load,
        })
    }

    /// Views that had to be sorted when the store was built.
    ///
    /// Pages saved from a store come back in title order, so reloading them never sorts the
    /// title view. The id permutation is not stored and is sorted unless ids follow title order.
    pub fn sorts_on_load(&self) -> ViewSorts {
        self.sorts_on_load
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    /// Returns true if the store holds no pages.
    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    /// Binary-searches the title view.
    ///
    /// Follows [`slice::binary_search_by`]: `Ok(index)` when found, `Err(insertion_point)` when not.
    pub fn search_title(&self, name: &str) -> std::result::Result<usize, usize> {
        self.by_title
            .binary_search_by(|page| page.compare_title_to(name.as_bytes()))
    }

    /// Position of `name` in the title view.
    pub fn find_by_title(&self, name: &str) -> Option<usize> {
        self.search_title(name).ok()
    }

    /// Page at `index` of the title view.
    pub fn get(&self, index: usize) -> Option<&PageRecord> {
        self.by_title.get(index)
    }

    /// Page with the exact title `name`.
    pub fn page_by_title(&self, name: &str) -> Option<&PageRecord> {
        self.find_by_title(name).map(|ix| &self.by_title[ix])
    }

    /// Page with the given id.
    pub fn page_by_id(&self, id: PageId) -> Option<&PageRecord> {
        let pos = self
            .by_id
            .binary_search_by(|&ix| self.by_title[ix as usize].id().cmp(&id))
            .ok()?;
        Some(&self.by_title[self.by_id[pos] as usize])
    }

    /// Titles starting with `prefix`, in title order, at most `max` of them.
    pub fn find_prefix_matches(&self, prefix: &str, max: usize) -> Vec<String> {
        let start = match self.search_title(prefix) {
            Ok(ix) | Err(ix) => ix,
        };
        // Matches are contiguous because the view is sorted.
        self.by_title[start..]
            .iter()
            .take_while(|page| page.title_bytes().starts_with(prefix.as_bytes()))
            .take(max)
            .map(|page| page.title().into_owned())
            .collect()
    }

    /// Uniformly chosen title, or `None` for an empty store.
    pub fn random_title(&self) -> Option<String> {
        self.random_title_with(&mut rand::thread_rng())
    }

    /// Like [`Self::random_title`] with a caller-supplied generator.
    pub fn random_title_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        if self.by_title.is_empty() {
            return None;
        }
        let ix = rng.gen_range(0..self.by_title.len());
        Some(self.by_title[ix].title().into_owned())
    }

    /// Pages in title order.
    pub fn pages(&self) -> &[PageRecord] {
        &self.by_title
    }

    /// Pages in ascending id order.
    pub fn iter_by_id(&self) -> impl ExactSizeIterator<Item = &PageRecord> + '_ {
        self.by_id.iter().map(|&ix| &self.by_title[ix as usize])
    }
}

/// Sorts `view` with `cmp` unless one linear pass shows it is already ordered.
///
/// Returns true when a sort was performed.
pub fn sort_if_needed<T, F>(view: &mut [T], name: &str, mut cmp: F) -> bool
where
    F: FnMut(&T, &T) -> Ordering,
{
    if is_sorted_by(view, &mut cmp) {
        debug!(view = name, "already sorted");
        return false;
    }
    let started = Instant::now();
    view.sort_by(cmp);
    info!(
        view = name,
        len = view.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sorted page view"
    );
    true
}

fn is_sorted_by<T, F>(view: &[T], cmp: &mut F) -> bool
where
    F: FnMut(&T, &T) -> Ordering,
{
    view.windows(2)
        .all(|pair| cmp(&pair[0], &pair[1]) != Ordering::Greater)
}
