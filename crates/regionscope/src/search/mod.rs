//! Query scoring and the search orchestrator.
//!
//! [`RegionSearcher`] merges every configured boundary index, scores each entry against
//! the query, and returns the best matches. Both the per-kind indices and the final
//! result lists are memoised in caches owned by the searcher (or injected into it).

mod orchestrator;
pub mod scoring;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};

use crate::index::SearchEntry;

pub use orchestrator::RegionSearcher;
pub use scoring::{edit_distance, is_numeric_query, score};

/// A search hit and the score that placed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntry {
    pub entry: SearchEntry,
    pub score: u32,
}

/// Result lists keyed by `(normalised query, limit)`. Entries never expire on their own.
///
/// Every [`ResultsCache::clear`] starts a new generation. A search reads the generation
/// before touching any index and passes it back on insert, so a list computed from
/// indices that were invalidated mid-search is never stored.
#[derive(Debug, Default)]
pub struct ResultsCache {
    state: Mutex<CachedResults>,
}

#[derive(Debug, Default)]
struct CachedResults {
    generation: u64,
    lists: HashMap<(String, usize), Arc<[ScoredEntry]>>,
}

impl ResultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CachedResults> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, query: &str, limit: usize) -> Option<Arc<[ScoredEntry]>> {
        self.lock().lists.get(&(query.to_string(), limit)).cloned()
    }

    /// Current generation; bumped by every clear.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Stores `results` unless the cache was cleared since `generation` was read.
    /// Returns whether the list was stored.
    pub fn insert(
        &self,
        query: String,
        limit: usize,
        results: Arc<[ScoredEntry]>,
        generation: u64,
    ) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.lists.insert((query, limit), results);
        true
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        state.lists.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
