use std::{cmp::Ordering, sync::Arc, time::Instant};

use rayon::prelude::*;
use regionscope_data::{BoundaryKind, BoundaryProvider, GeoJsonDirectory};
use tracing::{debug, info, instrument, warn};

use super::{
    ResultsCache, ScoredEntry,
    scoring::{is_numeric_query, score},
};
use crate::{
    config::SearchConfig,
    geometry::LngLat,
    index::{IndexCache, SearchEntry, definition_for},
    proximity,
};

/// Fuzzy search across every configured boundary and facility dataset.
///
/// Indices are built lazily on the first search that needs them, at most once per kind,
/// and results are cached per `(query, limit)`. Both caches can be shared between
/// searchers through [`RegionSearcher::with_caches`].
///
/// ```rust
/// use regionscope::{RegionSearcher, SearchConfig};
/// use regionscope::data::{BoundaryKind, InMemoryBoundaries, RawRecord};
/// use serde_json::json;
///
/// let record: RawRecord = serde_json::from_value(json!({
///     "geometry": {"type": "Point", "coordinates": [151.2, -33.87]},
///     "properties": {"SAL_NAME21": "Sydney", "SAL_CODE21": "SAL13665"}
/// }))?;
/// let provider = InMemoryBoundaries::new().with(BoundaryKind::Locality, vec![record]);
/// let searcher = RegionSearcher::new(provider, SearchConfig::default());
///
/// let results = searcher.search("syd", 5);
/// assert_eq!(results[0].name, "Sydney");
/// # Ok::<(), serde_json::Error>(())
/// ```
pub struct RegionSearcher {
    provider: Arc<dyn BoundaryProvider>,
    config: SearchConfig,
    indices: Arc<IndexCache>,
    results: Arc<ResultsCache>,
}

impl std::fmt::Debug for RegionSearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionSearcher")
            .field("config", &self.config)
            .field("indices", &self.indices)
            .field("cached_results", &self.results.len())
            .finish_non_exhaustive()
    }
}

impl RegionSearcher {
    pub fn new(provider: impl BoundaryProvider + 'static, config: SearchConfig) -> Self {
        Self::with_caches(
            Arc::new(provider),
            config,
            Arc::new(IndexCache::new()),
            Arc::new(ResultsCache::new()),
        )
    }

    /// Searcher over the GeoJSON files in the shared data directory.
    pub fn from_data_dir(config: SearchConfig) -> Self {
        Self::new(GeoJsonDirectory::from_data_dir(), config)
    }

    /// Searcher using externally owned caches; their lifetime is the caller's to manage.
    pub fn with_caches(
        provider: Arc<dyn BoundaryProvider>,
        config: SearchConfig,
        indices: Arc<IndexCache>,
        results: Arc<ResultsCache>,
    ) -> Self {
        Self {
            provider,
            config,
            indices,
            results,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn index_cache(&self) -> &IndexCache {
        &self.indices
    }

    pub fn results_cache(&self) -> &ResultsCache {
        &self.results
    }

    #[instrument(name = "Load index", level = "debug", skip(self))]
    fn build_index(&self, kind: BoundaryKind) -> Vec<SearchEntry> {
        let start = Instant::now();
        let records = match self.provider.fetch(kind) {
            Ok(records) => records,
            Err(e) => {
                warn!(%kind, error = %e, "Boundary source unavailable, using an empty index");
                return Vec::new();
            }
        };
        let entries = definition_for(kind, self.config.facility_point_padding).build(&records);
        info!(
            %kind,
            entries = entries.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Index ready"
        );
        entries
    }

    /// The index for `kind`, built on first use.
    pub fn index(&self, kind: BoundaryKind) -> Arc<[SearchEntry]> {
        self.indices
            .get_or_build(kind, || self.build_index(kind))
    }

    /// Every configured index in merge order. Missing indices are fetched concurrently.
    fn merged_indices(&self) -> Vec<Arc<[SearchEntry]>> {
        self.config
            .kinds
            .par_iter()
            .map(|&kind| self.index(kind))
            .collect()
    }

    /// Best matches for `query`, most relevant first.
    ///
    /// Queries shorter than the configured minimum return nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchEntry> {
        self.search_scored(query, limit)
            .iter()
            .map(|hit| hit.entry.clone())
            .collect()
    }

    /// [`RegionSearcher::search`] with the configured result limit.
    pub fn search_default(&self, query: &str) -> Vec<SearchEntry> {
        self.search(query, self.config.limit)
    }

    /// As [`RegionSearcher::search`], keeping each hit's score.
    #[instrument(name = "Region Search", level = "debug", skip(self))]
    pub fn search_scored(&self, query: &str, limit: usize) -> Arc<[ScoredEntry]> {
        let trimmed = query.trim();
        if trimmed.chars().count() < self.config.min_query_chars {
            debug!("Query too short");
            return Arc::from(Vec::new());
        }
        let key = trimmed.to_lowercase();
        if let Some(cached) = self.results.get(&key, limit) {
            debug!(hits = cached.len(), "Results cache hit");
            return cached;
        }

        let generation = self.results.generation();
        let numeric = is_numeric_query(&key);
        let boosts = &self.config.boosts;
        let mut hits: Vec<ScoredEntry> = self
            .merged_indices()
            .iter()
            .flat_map(|index| index.iter())
            .filter_map(|entry| {
                let score = score(&key, entry, boosts);
                (score > 0).then(|| ScoredEntry {
                    entry: entry.clone(),
                    score,
                })
            })
            .collect();

        // Stable: equal keys keep merge order.
        hits.sort_by(|a, b| {
            b.score.cmp(&a.score).then_with(|| {
                if numeric {
                    Ordering::Equal
                } else {
                    let a_locality = a.entry.kind == BoundaryKind::Locality;
                    let b_locality = b.entry.kind == BoundaryKind::Locality;
                    b_locality.cmp(&a_locality)
                }
            })
        });
        let matched = hits.len();
        hits.truncate(limit);

        debug!(matched, returned = hits.len(), "Search complete");
        let hits: Arc<[ScoredEntry]> = Arc::from(hits);
        if !self.results.insert(key, limit, Arc::clone(&hits), generation) {
            debug!("Indices changed during search, result not cached");
        }
        hits
    }

    /// Display strings for autocomplete: `"{name} ({code})"` or just the name.
    pub fn suggestions(&self, query: &str) -> Vec<String> {
        self.search_scored(query, self.config.suggestion_limit)
            .iter()
            .map(|hit| hit.entry.display_label())
            .collect()
    }

    /// The single best match for a place name.
    pub fn location_by_name(&self, name: &str) -> Option<SearchEntry> {
        self.search_scored(name, 1)
            .first()
            .map(|hit| hit.entry.clone())
    }

    /// Drops the index for `kind` and every cached result list.
    pub fn invalidate(&self, kind: BoundaryKind) {
        self.indices.invalidate(kind);
        self.results.clear();
    }

    pub fn invalidate_all(&self) {
        self.indices.clear();
        self.results.clear();
    }

    /// The `k` entries of `kind` closest to `target`.
    pub fn nearest_of_kind(
        &self,
        target: LngLat,
        kind: BoundaryKind,
        k: usize,
    ) -> Vec<(SearchEntry, f64)> {
        proximity::nearest(target, &self.index(kind), k)
    }

    /// Resolves `query` to its best match, then to the `k` entries of `kind` around it.
    ///
    /// When the best match is itself of `kind` it comes first at distance zero.
    #[instrument(name = "Resolve nearby", level = "debug", skip(self))]
    pub fn resolve_nearby(
        &self,
        query: &str,
        kind: BoundaryKind,
        k: usize,
    ) -> Vec<(SearchEntry, f64)> {
        let Some(top) = self.location_by_name(query) else {
            return Vec::new();
        };
        let Some(centroid) = top.centroid else {
            debug!(id = %top.id, "Best match has no centroid");
            return Vec::new();
        };
        if top.kind != kind {
            return self.nearest_of_kind(centroid, kind, k);
        }

        let index = self.index(kind);
        let others: Vec<SearchEntry> = index
            .iter()
            .filter(|entry| entry.id != top.id)
            .cloned()
            .collect();
        let mut resolved = Vec::with_capacity(k);
        if k > 0 {
            resolved.push((top, 0.0));
            resolved.extend(proximity::nearest(centroid, &others, k - 1));
        }
        resolved
    }
}
