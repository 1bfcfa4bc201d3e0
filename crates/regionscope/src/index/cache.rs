use std::sync::{Arc, PoisonError, RwLock};

use ahash::AHashMap as HashMap;
use once_cell::sync::OnceCell;
use regionscope_data::BoundaryKind;
use tracing::{debug, info};

use super::SearchEntry;

type Slot = Arc<OnceCell<Arc<[SearchEntry]>>>;

/// Memoised per-kind indices.
///
/// Each kind owns one slot. Concurrent callers for the same kind block on the slot
/// while the first one builds, so a kind is built at most once until invalidated.
#[derive(Debug, Default)]
pub struct IndexCache {
    slots: RwLock<HashMap<BoundaryKind, Slot>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: BoundaryKind) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(kind).or_default())
    }

    /// The cached index for `kind`, running `build` only if no build has completed.
    pub fn get_or_build<F>(&self, kind: BoundaryKind, build: F) -> Arc<[SearchEntry]>
    where
        F: FnOnce() -> Vec<SearchEntry>,
    {
        let slot = self.slot(kind);
        Arc::clone(slot.get_or_init(|| {
            debug!(%kind, "Index cache miss");
            Arc::from(build())
        }))
    }

    /// The cached index for `kind` if one has been built.
    pub fn get(&self, kind: BoundaryKind) -> Option<Arc<[SearchEntry]>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .and_then(|slot| slot.get().cloned())
    }

    /// Drops the index for `kind`; returns whether one was cached.
    pub fn invalidate(&self, kind: BoundaryKind) -> bool {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind)
            .is_some_and(|slot| slot.get().is_some());
        if removed {
            info!(%kind, "Index invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        info!("All indices invalidated");
    }

    /// Kinds with a completed build, sorted.
    pub fn built_kinds(&self) -> Vec<BoundaryKind> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut kinds: Vec<_> = slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(kind, _)| *kind)
            .collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builds_once_until_invalidated() {
        let cache = IndexCache::new();
        let builds = AtomicUsize::new(0);
        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        };

        cache.get_or_build(BoundaryKind::Sa2, build);
        cache.get_or_build(BoundaryKind::Sa2, build);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.built_kinds(), vec![BoundaryKind::Sa2]);

        assert!(cache.invalidate(BoundaryKind::Sa2));
        assert!(!cache.invalidate(BoundaryKind::Sa2));
        assert!(cache.get(BoundaryKind::Sa2).is_none());

        cache.get_or_build(BoundaryKind::Sa2, build);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_callers_share_one_build() {
        let cache = IndexCache::new();
        let builds = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    cache.get_or_build(BoundaryKind::Lga, || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Vec::new()
                    });
                });
            }
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_drops_every_kind() {
        let cache = IndexCache::new();
        cache.get_or_build(BoundaryKind::Lga, Vec::new);
        cache.get_or_build(BoundaryKind::Postcode, Vec::new);
        cache.clear();
        assert!(cache.built_kinds().is_empty());
    }
}
